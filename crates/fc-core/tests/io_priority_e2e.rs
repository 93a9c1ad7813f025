//! End-to-end IO priority check against the mock appliance.
//!
//! Covers:
//! - Bidirectional set/read-back over all collector daemons
//! - Multiple PIDs per daemon
//! - Explicit precondition failure when a daemon is not running

use fc_common::ProcessId;
use fc_core::ioprio::{self, IoPrioError, COLLECTOR_PROCESSES, PRIORITY_LEVELS};
use fc_remote::mock::{MockAppliance, MockApplianceBuilder};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn appliance_with_all_collectors() -> MockAppliance {
    MockApplianceBuilder::new()
        .with_process("sfcapd", &[1101])
        .with_process("xfcapd-streamd", &[1201, 1202])
        .with_process("nfcapd", &[1301])
        .build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn all_collectors_verified_bidirectionally() {
    let dut = appliance_with_all_collectors();
    let reports = ioprio::run_check(&dut).expect("check should pass");

    assert_eq!(reports.len(), COLLECTOR_PROCESSES.len());
    for report in &reports {
        assert_eq!(report.verified_levels, PRIORITY_LEVELS.to_vec());
    }

    // The last applied level is the production target
    for pid in [1101, 1201, 1202, 1301] {
        assert_eq!(dut.io_priority_of(pid), Some(0));
    }
}

#[test]
fn multiple_pids_are_each_exercised() {
    let dut = appliance_with_all_collectors();
    let report = ioprio::check_process(&dut, "xfcapd-streamd").unwrap();
    assert_eq!(report.pids, vec![ProcessId(1201), ProcessId(1202)]);

    let log = dut.command_log();
    for pid in [1201, 1202] {
        assert!(log.contains(&format!("ionice -p {} -n 3", pid)));
        assert!(log.contains(&format!("ionice -p {} -n 0", pid)));
    }
}

#[test]
fn level_three_is_applied_before_restore() {
    let dut = appliance_with_all_collectors();
    ioprio::check_process(&dut, "sfcapd").unwrap();

    let log = dut.command_log();
    let set_three = log
        .iter()
        .position(|c| c == "ionice -p 1101 -n 3")
        .expect("level 3 must be set");
    let set_zero = log
        .iter()
        .position(|c| c == "ionice -p 1101 -n 0")
        .expect("level 0 must be set");
    assert!(set_three < set_zero);
}

#[test]
fn missing_collector_is_a_precondition_failure() {
    // nfcapd deliberately not running
    let dut = MockApplianceBuilder::new()
        .with_process("sfcapd", &[1101])
        .with_process("xfcapd-streamd", &[1201])
        .build();

    let err = ioprio::run_check(&dut).unwrap_err();
    match err {
        IoPrioError::NoMatchingProcesses { process } => assert_eq!(process, "nfcapd"),
        other => panic!("expected NoMatchingProcesses, got: {}", other),
    }
}

#[test]
fn discovery_reports_pids_in_ps_order() {
    let dut = appliance_with_all_collectors();
    let pids = ioprio::discover_pids(&dut, "xfcapd-streamd").unwrap();
    assert_eq!(pids, vec![ProcessId(1201), ProcessId(1202)]);
}

//! Samba combination checks against the mock appliance.
//!
//! Replays the full (protocolVersion, authentication, port) matrix in
//! both authenticated and anonymous mode: backend artifact verification,
//! canary survival across a disable/import cycle, the client download
//! path, and erase semantics.

use fc_common::paths;
use fc_core::samba::roundtrip::{self, CANARY};
use fc_core::samba::{
    combination_matrix, run_matrix, run_round_trip, verify_backend, SambaConfig, VerifyError,
};
use fc_remote::files;
use fc_remote::mock::{MockAppliance, MockApplianceBuilder};
use fc_remote::storage::RemoteStorage;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SHARE_IP: &str = "192.168.4.156";

fn dut() -> MockAppliance {
    MockApplianceBuilder::new().build()
}

fn base_config() -> SambaConfig {
    SambaConfig::for_share(SHARE_IP)
}

// ---------------------------------------------------------------------------
// Backend artifact verification
// ---------------------------------------------------------------------------

#[test]
fn backend_artifacts_match_for_every_combination() {
    for (version, auth, port) in combination_matrix() {
        for authenticated in [true, false] {
            let dut = dut();
            let mut config = base_config().with_combination(version, auth, port);
            if !authenticated {
                config = config.anonymous();
            }

            roundtrip::apply_config(&dut, &config).expect("configuration must apply");
            verify_backend(&dut, &config).unwrap_or_else(|e| {
                panic!("backend mismatch for {}: {}", config.combination_label(), e)
            });
        }
    }
}

#[test]
fn repeated_apply_is_idempotent() {
    let dut = dut();
    let config = base_config();
    roundtrip::apply_config(&dut, &config).unwrap();
    roundtrip::apply_config(&dut, &config).unwrap();
    verify_backend(&dut, &config).unwrap();
}

#[test]
fn anonymous_mode_requires_no_password_field() {
    let dut = dut();
    let config = base_config().anonymous();
    roundtrip::apply_config(&dut, &config).unwrap();

    // The credentials artifact carries only the domain line
    let creds = files::read_file_root(&dut, paths::CREDENTIALS_FILE).unwrap();
    assert!(creds.contains("domain="));
    assert!(!creds.contains("password="));

    verify_backend(&dut, &config).unwrap();
}

#[test]
fn mismatch_embeds_observed_file_content() {
    let dut = dut();
    let applied = base_config();
    roundtrip::apply_config(&dut, &applied).unwrap();

    // Verify against a different port than was applied
    let mut other = base_config();
    other.port = 4460;
    let err = verify_backend(&dut, &other).unwrap_err();
    match err {
        VerifyError::Mismatch {
            field, ref content, ..
        } => {
            assert_eq!(field, "PORT");
            assert!(content.contains("PORT=\"445\""), "diagnostic must carry the artifact");
        }
        other => panic!("expected Mismatch, got: {}", other),
    }
}

#[test]
fn unconfigured_appliance_reports_empty_artifact() {
    let dut = dut();
    let err = verify_backend(&dut, &base_config()).unwrap_err();
    assert!(matches!(err, VerifyError::EmptyArtifact { .. }));
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_single_combination() {
    let dut = dut();
    let report = run_round_trip(&dut, &base_config()).expect("round trip must pass");

    assert!(report.file_name.starts_with("platformautotests_"));
    // Canary was erased from the share at the end of the run
    assert!(!dut.share_contains(&report.file_name));
    // Scratch directory was cleaned up
    assert!(dut
        .command_log()
        .contains(&format!("rm -rf {}", paths::SCRATCH_DIR)));
}

#[test]
fn uploaded_file_survives_disable_import_cycle() {
    let dut = dut();
    let config = base_config();
    roundtrip::apply_config(&dut, &config).unwrap();

    files::make_dir(&dut, paths::SCRATCH_DIR).unwrap();
    let local = paths::scratch_path("survivor");
    files::write_file(&dut, &local, CANARY).unwrap();
    RemoteStorage::upload(&dut, &local, "survivor").unwrap();

    // Cycle the service underneath the file
    RemoteStorage::disable(&dut).unwrap();
    assert!(!files::file_exists(&dut, &paths::share_path("survivor")).unwrap());
    RemoteStorage::upload_and_import(&dut, &config.render_xml()).unwrap();

    let content = files::read_file(&dut, &paths::share_path("survivor")).unwrap();
    assert_eq!(content.trim(), CANARY);
}

#[test]
fn download_path_sees_identical_content() {
    let dut = dut();
    let config = base_config();
    roundtrip::apply_config(&dut, &config).unwrap();

    files::make_dir(&dut, paths::SCRATCH_DIR).unwrap();
    let local = paths::scratch_path("payload");
    files::write_file(&dut, &local, CANARY).unwrap();
    RemoteStorage::upload(&dut, &local, "payload").unwrap();

    let dest = paths::scratch_path("payload_back");
    RemoteStorage::download(&dut, "payload", &dest).unwrap();
    assert_eq!(files::read_file(&dut, &dest).unwrap().trim(), CANARY);
}

#[test]
fn erase_makes_existence_checks_false() {
    let dut = dut();
    let config = base_config();
    roundtrip::apply_config(&dut, &config).unwrap();

    files::make_dir(&dut, paths::SCRATCH_DIR).unwrap();
    let local = paths::scratch_path("victim");
    files::write_file(&dut, &local, CANARY).unwrap();
    RemoteStorage::upload(&dut, &local, "victim").unwrap();
    assert!(files::file_exists(&dut, &paths::share_path("victim")).unwrap());

    RemoteStorage::erase(&dut, &paths::share_path("victim")).unwrap();
    assert!(!files::file_exists(&dut, &paths::share_path("victim")).unwrap());
}

#[test]
fn round_trip_full_matrix_passes() {
    let dut = dut();
    let outcome = run_matrix(&dut, &base_config());

    assert_eq!(outcome.total, 10);
    assert_eq!(outcome.failed, 0, "failures: {:?}", outcome.results);
    assert_eq!(outcome.successful, 10);
}

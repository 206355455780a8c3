use fleet_util::errors::FleetError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = FleetError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_manifest_error_display() {
    let err = FleetError::Manifest {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Manifest error: bad syntax");
}

#[test]
fn test_graph_error_display() {
    let err = FleetError::Graph {
        message: "cycle among a, b".to_string(),
    };
    assert_eq!(err.to_string(), "Dependency graph error: cycle among a, b");
}

#[test]
fn test_config_error_display() {
    let err = FleetError::Config {
        message: "no package matches 'x*'".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: no package matches 'x*'");
}

#[test]
fn test_build_error_display() {
    let err = FleetError::Build {
        message: "make exited with 2".to_string(),
    };
    assert_eq!(err.to_string(), "Build failed: make exited with 2");
}

#[test]
fn test_generic_error_display() {
    let err = FleetError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let fleet_err: FleetError = io_err.into();
    assert!(matches!(fleet_err, FleetError::Io(_)));
}

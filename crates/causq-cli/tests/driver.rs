use super::*;
use causq_engine::EngineState;
use causq_model::MethodId;
use std::path::PathBuf;

/// Write a tiny but complete model directory:
/// root -> a.foo() -> a.bar() by direct calls, b.virt() reached through a
/// single-type typeflow seeded from the white-hole.
fn write_model_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = |name: &str| -> PathBuf { dir.path().join(name) };

    fs::write(path("types.txt"), "java.lang.String\n").unwrap();
    fs::write(
        path("methods.txt"),
        "root\na.foo()\na.bar()\nb.virt()\n",
    )
    .unwrap();

    // Filter pool: [0] = {}, [1] = {String}; 1-type universe -> 1-byte records.
    fs::write(path("typestates.bin"), [0u8, 1u8]).unwrap();

    let edges = |pairs: &[(u32, u32)]| -> Vec<u8> {
        let mut out = Vec::new();
        for &(a, b) in pairs {
            out.extend_from_slice(&a.to_le_bytes());
            out.extend_from_slice(&b.to_le_bytes());
        }
        out
    };
    // Typeflows: 0 = white-hole, 1 = the virtual dispatch source.
    fs::write(path("interflows.bin"), edges(&[(0, 1)])).unwrap();
    fs::write(path("direct_invokes.bin"), edges(&[(0, 1), (1, 2)])).unwrap();

    let words = |ws: &[u32]| -> Vec<u8> { ws.iter().flat_map(|w| w.to_le_bytes()).collect() };
    // Flow 1 may reach method 3 (high bit = reaching).
    fs::write(path("typeflow_methods.bin"), words(&[0, (1 << 31) | 3])).unwrap();
    fs::write(path("typeflow_filters.bin"), words(&[0, 1])).unwrap();

    dir
}

#[test]
fn load_model_reads_all_tables() {
    let dir = write_model_dir();
    let model = load_model(dir.path()).unwrap();

    assert_eq!(model.adj.n_types(), 1);
    assert_eq!(model.adj.n_methods(), 4);
    assert_eq!(model.adj.n_typeflows(), 2);
    assert_eq!(model.method_name(MethodId(3)), "b.virt()");
    assert_eq!(
        model.adj[MethodId(3)].virtual_invocation_sources,
        vec![causq_model::TypeflowId(1)]
    );
}

#[test]
fn loaded_model_answers_purge_queries() {
    let dir = write_model_dir();
    let mut model = load_model(dir.path()).unwrap();
    model.optimize();

    let baseline = EngineState::simulate_purge(&model.adj, &[]);
    assert_eq!(baseline.reachable_count(), 4);

    // Purging a.foo() cuts off a.bar() but not the virtual dispatch.
    let cut = EngineState::simulate_purge(&model.adj, &[MethodId(1)]);
    assert!(!cut.is_reached(MethodId(1)));
    assert!(!cut.is_reached(MethodId(2)));
    assert!(cut.is_reached(MethodId(3)));
}

#[test]
fn load_model_reports_missing_tables() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("types.txt"), "T\n").unwrap();
    let err = load_model(dir.path()).unwrap_err();
    assert!(err.to_string().contains("methods.txt"));
}

#[test]
fn load_model_reports_corrupt_tables() {
    let dir = write_model_dir();
    fs::write(dir.path().join("interflows.bin"), [1u8, 2, 3]).unwrap();
    let err = load_model(dir.path()).unwrap_err();
    assert!(err.to_string().contains("record size"));
}

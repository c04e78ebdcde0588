use std::fs;
use std::path::Path;

use dosgen::data::kernel::check_inputs;
use dosgen::{
    pipeline, BroadeningKernel, DosError, EnergyGrid, GenerateRequest, KernelShape, Settings,
    Variant,
};

/// Drops each band energy into its nearest grid bin with unit area.
struct HistogramKernel;

impl BroadeningKernel for HistogramKernel {
    fn broaden(
        &self,
        shape: KernelShape,
        bands: &[f64],
        energy: &[f64],
        weights: &[f64],
    ) -> dosgen::error::Result<Vec<f64>> {
        check_inputs(shape, bands, energy, weights)?;
        let spacing = energy[1] - energy[0];
        let per_kpoint = 2 * shape.n_bands;
        let mut dos = vec![0.0; shape.dos_len()];
        for (block, levels) in bands.chunks(per_kpoint).enumerate() {
            let out = &mut dos[block * shape.n_energy..(block + 1) * shape.n_energy];
            for &level in levels {
                let bin = ((level - energy[0]) / spacing).round();
                if bin >= 0.0 && (bin as usize) < shape.n_energy {
                    out[bin as usize] += 1.0 / spacing;
                }
            }
        }
        Ok(dos)
    }
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn settings(root: &Path, max_resolution: usize) -> Settings {
    Settings {
        data_root: root.to_path_buf(),
        max_resolution,
        fermi_samples: 3,
        ..Settings::default()
    }
}

fn request(dataset: &str, resolution: usize, constraint: &str) -> GenerateRequest {
    GenerateRequest {
        dataset: dataset.to_string(),
        resolution,
        eta: 0.1,
        constraint: constraint.to_string(),
        masks: "n".to_string(),
        seed: None,
    }
}

/// Four result files: one superseded by a lower-energy sibling of the same
/// family, one unconverged, and one with a gap wide enough to be sampled.
fn kernel_dataset(root: &Path) {
    let dir = root.join("hf_test");
    let bands = dir.join("bands");
    write(
        &dir.join("config.txt"),
        &format!(
            "path {}\nNb 1\nbegin kpoints\nG 0\nX 1\nend kpoints\n",
            bands.join("*.txt").display()
        ),
    );
    let rows = "-1.0 1.0\n-1.0 1.0\n";
    write(
        &bands.join("type11_JU0.10_N1.00_U2.00_band.txt"),
        &format!("# e -3.0 m 0.4 gap 0.0\n{rows}"),
    );
    write(
        &bands.join("type12_JU0.10_N1.00_U2.00_band.txt"),
        &format!("# e -2.0 m 0.4 gap 0.0\n{rows}"),
    );
    write(
        &bands.join("type21_JU0.10_N1.00_U2.00_band.txt"),
        &format!("# e -1.0 m 0.05 gap 2.0\n{rows}"),
    );
    write(
        &bands.join("type11_JU0.10_N1.00_U3.00_nost_F_band.txt"),
        &format!("# e -9.0 m 0.4 gap 0.0\n{rows}"),
    );
}

#[test]
fn kernel_dataset_expands_gapped_ground_states() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let settings = settings(dir.path(), 64);

    let report = pipeline::generate(
        &settings,
        &request("hf_test", 32, "n"),
        Some(&HistogramKernel),
    )
    .unwrap();
    assert_eq!(report.variant, Variant::Kernel);
    assert_eq!(report.assembled, 4);
    assert_eq!(report.kept, 4);
    assert_eq!(report.dos_width, 64);
    assert!(report.path.ends_with("hf_test/dos_n_Ne32_eta0.10.csv"));

    let (descriptor, table) = pipeline::load_table(&report.path).unwrap();
    assert_eq!(descriptor.labels(), vec!["G", "X"]);
    assert_eq!(table.n_energy, 32);
    let energies: Vec<f64> = table.rows.iter().map(|r| r.params.energy).collect();
    assert_eq!(energies, vec![-3.0, -1.0, -1.0, -1.0]);
    let indices: Vec<usize> = table.rows.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    // offsets -1, 0, +1 move the levels into different bins
    assert_ne!(table.rows[1].dos, table.rows[2].dos);
    assert_ne!(table.rows[2].dos, table.rows[3].dos);
    assert_eq!(table.rows[0].dos, table.rows[2].dos);
}

#[test]
fn moment_constraint_drops_rows_and_names_output() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let settings = settings(dir.path(), 64);

    let report = pipeline::generate(
        &settings,
        &request("hf_test", 64, "m"),
        Some(&HistogramKernel),
    )
    .unwrap();
    assert_eq!(report.assembled, 4);
    assert_eq!(report.kept, 1);
    assert!(report.path.ends_with("hf_test/dos_n_Ne64_eta0.10_m0.10.csv"));

    let (_, table) = pipeline::load_table(&report.path).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows[0].params.moment, 0.4);
}

#[test]
fn check_flags_rows_below_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let mut settings = settings(dir.path(), 64);

    let report = pipeline::generate(
        &settings,
        &request("hf_test", 32, "n"),
        Some(&HistogramKernel),
    )
    .unwrap();

    // each k-point block integrates to the two levels it holds
    settings.defect_tolerance = 1.0;
    let clean = pipeline::check(&settings, &report.path).unwrap();
    assert!(clean.flagged.is_empty());
    for row in &clean.integrals {
        for value in row {
            assert!((value - 2.0).abs() < 1e-6);
        }
    }

    settings.defect_tolerance = 3.0;
    let defective = pipeline::check(&settings, &report.path).unwrap();
    assert_eq!(defective.flagged.len(), 4);
}

#[test]
fn kernel_dataset_without_kernel_fails() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let settings = settings(dir.path(), 64);

    assert!(pipeline::generate(&settings, &request("hf_test", 32, "n"), None).is_err());
    assert!(!dir.path().join("hf_test/dos_n_Ne32_eta0.10.csv").exists());
}

fn two_peak_curve(n: usize, low: usize, high: usize) -> String {
    let mut text = String::from("# energy dos\n");
    for i in 0..n {
        let v = if i == low || i == high { 1.0 } else { 0.1 };
        text.push_str(&format!("{i} {v}\n"));
    }
    text
}

#[test]
fn direct_dataset_block_sums_scaled_curves() {
    let dir = tempfile::tempdir().unwrap();
    let curves = dir.path().join("dmft_test/curves");
    write(
        &dir.path().join("dmft_test/config.txt"),
        &format!(
            "path {}\nNb 1\nbegin kpoints\n(G, 0)\n(X, 1)\nend kpoints\n",
            curves.join("*_kG_*.dat").display()
        ),
    );
    let base = "type12_JU0.10_N2.00_U3.00";
    write(
        &curves.join(format!("{base}_UF6.00_ep0.10_kG_dos.dat")),
        &two_peak_curve(16, 4, 11),
    );
    write(
        &curves.join(format!("{base}_UF6.00_ep0.10_kX_dos.dat")),
        &two_peak_curve(16, 5, 10),
    );
    // too weak, and wrong broadening
    write(
        &curves.join(format!("{base}_UF4.00_ep0.10_kG_dos.dat")),
        &two_peak_curve(16, 4, 11),
    );
    write(
        &curves.join(format!("{base}_UF6.00_ep0.20_kG_dos.dat")),
        &two_peak_curve(16, 4, 11),
    );

    let settings = settings(dir.path(), 16);
    let report = pipeline::generate(&settings, &request("dmft_test", 8, "gap"), None).unwrap();
    assert_eq!(report.variant, Variant::DirectCurve);
    assert_eq!(report.assembled, 1);
    assert_eq!(report.kept, 1);
    assert_eq!(report.dos_width, 16);

    let (_, table) = pipeline::load_table(&report.path).unwrap();
    let row = &table.rows[0];
    // grid spacing 16/15; narrower X gap wins
    assert!((row.params.gap - 5.0 * 16.0 / 15.0).abs() < 1e-6);
    assert_eq!(row.params.energy, 0.0);
    assert_eq!(row.params.interaction, 3.0);

    let expected_g = [1.2, 1.2, 6.6, 1.2, 1.2, 6.6, 1.2, 1.2];
    for (got, want) in table.block(row, 0).iter().zip(expected_g) {
        assert!((got - want).abs() < 1e-6, "{got} != {want}");
    }
}

/// Names of the tables written into a dataset directory.
fn written_tables(dataset_dir: &Path) -> Vec<String> {
    fs::read_dir(dataset_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("dos_"))
        .collect()
}

#[test]
fn curve_without_gap_edge_names_the_kpoint() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dmft_nogap");
    let curves = dataset.join("curves");
    write(
        &dataset.join("config.txt"),
        &format!(
            "path {}\nNb 1\nbegin kpoints\nG 0\nX 1\nend kpoints\n",
            curves.join("*_kG_*.dat").display()
        ),
    );
    let base = "type12_JU0.10_N2.00_U3.00_UF6.00_ep0.10";
    write(
        &curves.join(format!("{base}_kG_dos.dat")),
        &two_peak_curve(16, 4, 11),
    );
    // single maximum, below the Fermi index only
    write(
        &curves.join(format!("{base}_kX_dos.dat")),
        &two_peak_curve(16, 4, 4),
    );

    let settings = settings(dir.path(), 16);
    let err = pipeline::generate(&settings, &request("dmft_nogap", 8, "n"), None).unwrap_err();
    match err.downcast_ref::<DosError>() {
        Some(DosError::NoGapFound { path, label }) => {
            assert_eq!(label, "X");
            assert!(path.ends_with(format!("{base}_kX_dos.dat")));
        }
        other => panic!("expected NoGapFound, got {other:?}"),
    }
    assert!(written_tables(&dataset).is_empty());
}

#[test]
fn descriptor_without_band_count_fails_before_assembly() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let config = dir.path().join("hf_test/config.txt");
    let text = fs::read_to_string(&config).unwrap().replace("Nb 1\n", "");
    fs::write(&config, text).unwrap();

    let settings = settings(dir.path(), 64);
    let err = pipeline::generate(
        &settings,
        &request("hf_test", 32, "n"),
        Some(&HistogramKernel),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DosError>(),
        Some(DosError::Descriptor { path, .. }) if path == &config
    ));
    assert!(written_tables(&dir.path().join("hf_test")).is_empty());
}

#[test]
fn stale_grid_file_aborts_generation() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let settings = settings(dir.path(), 64);
    EnergyGrid::uniform(31, settings.energy_range)
        .save(&settings.energy_path(32))
        .unwrap();

    let err = pipeline::generate(
        &settings,
        &request("hf_test", 32, "n"),
        Some(&HistogramKernel),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DosError>(),
        Some(DosError::Shape { .. })
    ));
    assert!(written_tables(&dir.path().join("hf_test")).is_empty());
}

#[test]
fn configuration_errors_are_typed() {
    let dir = tempfile::tempdir().unwrap();
    kernel_dataset(dir.path());
    let settings = settings(dir.path(), 64);

    let err = pipeline::generate(&settings, &request("missing", 32, "n"), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DosError>(),
        Some(DosError::ConfigNotFound(_))
    ));

    let err = pipeline::generate(&settings, &request("hf_test", 30, "n"), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DosError>(),
        Some(DosError::UnsupportedResolution { requested: 30, max: 64 })
    ));

    let err = pipeline::generate(&settings, &request("hf_test", 32, "q"), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DosError>(),
        Some(DosError::UnknownConstraint(_))
    ));
}

#[test]
fn energy_grid_files_follow_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), 100);

    let path = pipeline::generate_energy(&settings, 25).unwrap();
    assert!(path.ends_with("energy_Ne25.dat"));
    assert!(dir.path().join("energy_Ne100.dat").exists());

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 25);
}

//! Integration tests for profile loading, ordination and enrichment.

use comparative_analysis::ordination::{double_center, pairwise};
use comparative_analysis::pipeline::{AnalysisStatus, REPORT_FILE};
use comparative_analysis::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, NamedTempFile};

fn write_lines(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn write_file(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    path
}

fn lines(rows: &[&str]) -> Vec<String> {
    rows.iter().map(|s| s.to_string()).collect()
}

/// Synthetic sample-major abundance table.
///
/// - 30 samples in 3 groups of 10
/// - taxon_0..3 are enriched in group "2"
/// - taxon_4..7 are enriched in group "0"
/// - the rest carry noise only
fn synthetic_abundance() -> Vec<String> {
    let n_features = 12;
    let n_samples = 30;

    let mut rng_seed = 7u64;
    let simple_rand = |seed: &mut u64| -> f64 {
        *seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((*seed >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut out = Vec::new();
    let header: Vec<String> = (0..n_features).map(|j| format!("taxon_{}", j)).collect();
    out.push(format!("sample\t{}", header.join("\t")));

    for sample in 0..n_samples {
        let group = sample % 3;
        let values: Vec<String> = (0..n_features)
            .map(|feat| {
                let base = match feat {
                    0..=3 if group == 2 => 400.0,
                    4..=7 if group == 0 => 300.0,
                    _ => 100.0,
                };
                let noise = 0.8 + 0.4 * simple_rand(&mut rng_seed);
                format!("{}", (base * noise).round())
            })
            .collect();
        out.push(format!("sample_{}\t{}", sample, values.join("\t")));
    }
    out
}

fn synthetic_metadata() -> Vec<String> {
    let mut out = vec!["sample_id\tgroup\tsite\tage".to_string()];
    for sample in 0..30 {
        let site = if sample < 15 { "gut" } else { "oral" };
        out.push(format!("sample_{}\t{}\t{}\t{}", sample, sample % 3, site, 20 + sample));
    }
    out
}

#[test]
fn test_two_class_ttest_scenario() {
    // beta and alpha carry identical values, so their p-values tie
    let abundance = write_lines(&lines(&[
        "sample\tbeta\talpha\tgamma",
        "S1\t1\t1\t10",
        "S2\t2\t2\t12",
        "S3\t5\t5\t11",
        "S4\t7\t7\t9",
    ]));
    let metadata = write_lines(&lines(&["S1\tA", "S2\tA", "S3\tB", "S4\tB"]));

    let profile = Profile::load(abundance.path(), metadata.path(), &ProfileOptions::new()).unwrap();
    let enrichment = run_enrichment(&profile, TwoSampleTest::TTest, &Correction::None).unwrap();
    let Enrichment::TwoClass { result, .. } = enrichment else {
        panic!("expected a two-class result");
    };

    assert_eq!(result.rows.len(), 3);
    assert!(result.not_applicable.is_empty());
    for row in &result.rows {
        assert!(row.p_value >= 0.0 && row.p_value <= 1.0);
    }
    for pair in result.rows.windows(2) {
        assert!(pair[0].p_value <= pair[1].p_value);
    }
    let names: Vec<_> = result.rows.iter().map(|r| r.feature.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    assert_eq!(result.rows[0].direction, Direction::Class("B".into()));
}

#[test]
fn test_three_class_pairwise_scenario() {
    let abundance = write_lines(&synthetic_abundance());
    let metadata = write_lines(&synthetic_metadata());
    let options = ProfileOptions::new().metadata_header(true).metadata_label("group");

    let profile = Profile::load(abundance.path(), metadata.path(), &options).unwrap();
    assert_eq!(profile.references().class_names(), vec!["0", "1", "2"]);

    let enrichment = run_enrichment(&profile, TwoSampleTest::TTest, &Correction::None).unwrap();
    let Enrichment::Pairwise { result, .. } = &enrichment else {
        panic!("expected a pairwise result");
    };

    assert_eq!(result.comparisons.len(), 3);
    assert_eq!(result.master.len(), 3 * profile.n_features());
    let tags = ["0 vs 1", "0 vs 2", "1 vs 2"];
    for (k, tag) in tags.iter().enumerate() {
        let block = &result.master[k * 12..(k + 1) * 12];
        assert!(block.iter().all(|r| r.comparison == *tag));
    }

    // the planted signal is the strongest hit of "0 vs 2"
    let zero_vs_two = &result.comparisons[1];
    let top = &zero_vs_two.rows[0];
    assert!(top.feature.starts_with("taxon_"));
    assert!(top.p_value < 1e-6);
    let index: usize = top.feature["taxon_".len()..].parse().unwrap();
    assert!(index < 8);

    let dir = tempdir().unwrap();
    let paths = write_enrichment(&enrichment, dir.path()).unwrap();
    assert_eq!(paths.len(), 4);
    let master = fs::read_to_string(dir.path().join("enrichment_master.tab")).unwrap();
    assert_eq!(master.lines().count(), 1 + 36);
}

#[test]
fn test_partition_property() {
    let abundance = write_lines(&synthetic_abundance());
    let metadata = write_lines(&synthetic_metadata());

    for label in ["group", "site", "age"] {
        let options = ProfileOptions::new().metadata_header(true).metadata_label(label);
        let profile = Profile::load(abundance.path(), metadata.path(), &options).unwrap();
        let refs = profile.references();

        refs.validate_partition(profile.abundance().sample_ids()).unwrap();
        assert_eq!(refs.total_sample_count(), 30);
        assert!(refs.iter().all(|g| !g.sample_ids.is_empty()));
        assert_eq!(refs.sample_order(), profile.abundance().sample_ids());
    }
}

#[test]
fn test_numeric_label_groups_in_numeric_order() {
    let abundance = write_lines(&synthetic_abundance());
    let metadata = write_lines(&synthetic_metadata());
    let options = ProfileOptions::new().metadata_header(true).metadata_label("age");
    let profile = Profile::load(abundance.path(), metadata.path(), &options).unwrap();

    let names = profile.references().class_names();
    assert_eq!(names.len(), 30);
    assert_eq!(names[0], "20");
    assert_eq!(names[29], "49");
}

#[test]
fn test_filters_apply_before_grouping() {
    let abundance = write_lines(&synthetic_abundance());
    let metadata = write_lines(&synthetic_metadata());
    let options = ProfileOptions::new()
        .metadata_header(true)
        .metadata_label("group")
        .filter_labels(vec!["sample_0".to_string()])
        .filter_rules(vec![
            FilterRule::new(Some("site"), Operator::Eq, "oral"),
            FilterRule::new(Some("age"), Operator::Gt, "30"),
        ]);
    let profile = Profile::load(abundance.path(), metadata.path(), &options).unwrap();

    // samples 1..=10 remain: 0 by name, 11..14 by age, 15.. by site
    assert_eq!(profile.n_samples(), 10);
    assert!(!profile.abundance().sample_ids().contains(&"sample_0".to_string()));
}

#[test]
fn test_feature_major_input() {
    let sample_major = synthetic_abundance();
    let header: Vec<&str> = sample_major[0].split('\t').collect();
    let rows: Vec<Vec<&str>> = sample_major[1..].iter().map(|r| r.split('\t').collect()).collect();

    let mut feature_major = vec![format!(
        "feature\t{}",
        rows.iter().map(|r| r[0]).collect::<Vec<_>>().join("\t")
    )];
    for (j, name) in header.iter().enumerate().skip(1) {
        let values: Vec<&str> = rows.iter().map(|r| r[j]).collect();
        feature_major.push(format!("{}\t{}", name, values.join("\t")));
    }

    let metadata = write_lines(&synthetic_metadata());
    let options = ProfileOptions::new().metadata_header(true).metadata_label("group");
    let a = Profile::load(write_lines(&sample_major).path(), metadata.path(), &options).unwrap();
    let b = Profile::load(write_lines(&feature_major).path(), metadata.path(), &options).unwrap();

    assert_eq!(a.abundance().data(), b.abundance().data());
    assert_eq!(a.abundance().feature_ids(), b.abundance().feature_ids());
}

#[test]
fn test_pca_ordering_property() {
    let abundance = write_lines(&synthetic_abundance());
    let metadata = write_lines(&synthetic_metadata());
    let options = ProfileOptions::new().metadata_header(true).metadata_label("group");
    let mut profile = Profile::load(abundance.path(), metadata.path(), &options).unwrap();
    profile.normalize(Normalization::Relative).unwrap();

    for k in 0..5 {
        let result = pca(&profile, k).unwrap();
        let [r1, r2] = result.variance_ratio.unwrap();
        assert!(r1 >= r2);
        assert_eq!(result.loadings.len(), k);
        for pair in result.loadings.windows(2) {
            assert!(pair[0].norm >= pair[1].norm);
        }
    }
    assert!(matches!(pca(&profile, 5), Err(CaError::InvalidLoadingCount(5))));
}

#[test]
fn test_pcoa_centered_matrix_symmetric() {
    let abundance = write_lines(&synthetic_abundance());
    let metadata = write_lines(&synthetic_metadata());
    let options = ProfileOptions::new().metadata_header(true).metadata_label("group");
    let profile = Profile::load(abundance.path(), metadata.path(), &options).unwrap();

    for metric in [
        DistanceMetric::BrayCurtis,
        DistanceMetric::Euclidean,
        DistanceMetric::Canberra,
        DistanceMetric::Cosine,
    ] {
        let d = pairwise(profile.abundance().data(), &metric).unwrap();
        let a = d.map(|x| -0.5 * x * x);
        let b = double_center(&a);
        let asymmetry = (&b - b.transpose()).amax();
        assert!(asymmetry < 1e-9);

        let coords = pcoa(&profile, &metric).unwrap();
        assert_eq!(coords.n_samples(), 30);
        let [l1, l2] = coords.eigenvalues.unwrap();
        assert!(l1 >= l2);
    }
}

#[test]
fn test_bh_literal_non_monotone() {
    let ids: Vec<String> = vec!["k1".into(), "k2".into(), "k3".into()];
    let adjusted = correct_bh(&[0.01, 0.04, 0.05], &ids, 3);
    assert!((adjusted[0] - 0.03).abs() < 1e-12);
    assert!((adjusted[1] - 0.06).abs() < 1e-12);
    assert!((adjusted[2] - 0.05).abs() < 1e-12);

    assert_eq!(correct_bonferroni(&[0.0371], 1), vec![0.0371]);
}

fn batch_fixture(dir: &Path, policy: &str, analyses: &str) -> AnalysisConfig {
    let abundance = write_file(dir, "abundance.tab", &synthetic_abundance());
    let metadata = write_file(dir, "metadata.tab", &synthetic_metadata());
    let yaml = format!(
        "abundance: {}\nmetadata: {}\nmetadata_header: true\nmetadata_label: group\n\
         output_directory: {}\nfailure_policy: {}\nnormalization: relative\nanalyses:\n{}",
        abundance.display(),
        metadata.display(),
        dir.join("results").display(),
        policy,
        analyses
    );
    AnalysisConfig::from_yaml(&yaml).unwrap()
}

#[test]
fn test_batch_runs_all_analyses() {
    let dir = tempdir().unwrap();
    let analyses = "  - type: pca
    loadings: 3
  - type: pcoa
    metric: braycurtis
  - type: enrichment
    test: ranksums
  - type: enrichment
    test: ttest
    correction: fdr-0.05
    filter_rules:
      - label: group
        operator: \"=\"
        value: \"1\"
";
    let config = batch_fixture(dir.path(), "abort", analyses);
    let report = run_batch(&config).unwrap();

    assert_eq!(report.n_completed(), 4);
    let results = dir.path().join("results");
    assert!(results.join("pca/pca.json").exists());
    assert!(results.join("pcoa/pcoa_braycurtis.json").exists());
    assert!(results.join("enrichment/ttest_ind_0_vs_1.tab").exists());
    assert!(results.join("enrichment/enrichment_master.tab").exists());
    assert!(results.join("enrichment_2/ttest_ind.tab").exists());
    assert!(results.join("enrichment_2/normalized_abundance_data.tab").exists());
    assert!(results.join(REPORT_FILE).exists());

    let pca_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(results.join("pca/pca.json")).unwrap()).unwrap();
    assert_eq!(pca_json["loadings"].as_array().unwrap().len(), 3);
    assert_eq!(pca_json["sample_ids"].as_array().unwrap().len(), 30);
}

#[test]
fn test_batch_failure_policies() {
    let analyses = "  - type: pcoa
    metric: euclidean
    metadata_label: missing_column
  - type: pca
";

    let dir = tempdir().unwrap();
    let config = batch_fixture(dir.path(), "abort", analyses);
    let err = run_batch(&config).unwrap_err();
    assert!(matches!(err, CaError::Pipeline(_)));
    assert!(err.to_string().contains("missing_column"));
    assert!(!dir.path().join("results/pca").exists());

    let dir = tempdir().unwrap();
    let config = batch_fixture(dir.path(), "skip_and_continue", analyses);
    let report = run_batch(&config).unwrap();
    assert_eq!(report.n_failed(), 1);
    assert!(matches!(
        report.get("pcoa").unwrap().status,
        AnalysisStatus::Failed { .. }
    ));
    assert!(report.get("pca").unwrap().is_completed());
    assert!(dir.path().join("results/pca/pca.json").exists());
}

use approx::assert_abs_diff_eq;
use single_anova::data::{Factor, MetadataColumn};
use single_anova::modeling::anova::type_ii_anova;
use single_anova::modeling::formula::ModelSpec;
use single_anova::{AnovaConfig, AnovaError, AnovaTerm};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

#[cfg(test)]
mod quick_test {
    use super::*;

    fn factor(name: &str, labels: &[&str]) -> Factor {
        MetadataColumn::categorical(labels).to_factor(name).unwrap()
    }

    #[test]
    fn check_unbalanced_type_ii() {
        // Cells: (p,x) = [1, 3], (p,y) = [5], (q,x) = [7], (q,y) = [9, 11, 13]
        // Exact nested-model residual sums of squares:
        //   RSS(1 + b) = 161/3, RSS(1 + a) = 28, RSS(1 + a + b) = 176/17, RSS(full) = 10
        let y = [1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0];
        let a = factor("a", &["p", "p", "p", "q", "q", "q", "q"]);
        let b = factor("b", &["x", "x", "y", "x", "y", "y", "y"]);
        let spec = ModelSpec::two_way("Expression", "a", "b");

        let table = type_ii_anova(&y, &[&a, &b], &spec, &AnovaConfig::default()).unwrap();
        let rows = table.rows();

        println!("{}", table);

        assert_abs_diff_eq!(rows[0].sum_sq, 161.0 / 3.0 - 176.0 / 17.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rows[1].sum_sq, 28.0 - 176.0 / 17.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rows[2].sum_sq, 176.0 / 17.0 - 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rows[3].sum_sq, 10.0, epsilon = 1e-9);
        assert_eq!(rows[3].df, 3.0);

        // Sequential (type-I) SS for `a` would be 112 - 28 = 84; type-II adjusts for `b`
        assert!(rows[0].sum_sq < 50.0);

        let scale = 10.0 / 3.0;
        let dist = FisherSnedecor::new(1.0, 3.0).unwrap();
        for row in &rows[..3] {
            let f = row.f_statistic.unwrap();
            assert_abs_diff_eq!(f, row.sum_sq / scale, epsilon = 1e-9);
            assert_abs_diff_eq!(row.p_value.unwrap(), dist.sf(f), epsilon = 1e-12);
        }
    }

    #[test]
    fn check_term_order_and_labels() {
        let y = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        let diet = factor("Diet", &["A", "A", "A", "B", "B", "B"]);
        let geno = factor("Genotype", &["X", "Y", "X", "Y", "X", "Y"]);
        let spec = ModelSpec::two_way("Expression", "Diet", "Genotype");
        let table = type_ii_anova(&y, &[&diet, &geno], &spec, &AnovaConfig::default()).unwrap();

        let terms: Vec<AnovaTerm> = table.rows().iter().map(|r| r.term.clone()).collect();
        assert_eq!(
            terms,
            vec![
                AnovaTerm::Main("Diet".into()),
                AnovaTerm::Main("Genotype".into()),
                AnovaTerm::Interaction("Diet".into(), "Genotype".into()),
                AnovaTerm::Residual,
            ]
        );
        let labels: Vec<String> = terms.iter().map(AnovaTerm::label).collect();
        assert_eq!(
            labels,
            vec!["C(Diet)", "C(Genotype)", "C(Diet):C(Genotype)", "Residual"]
        );
        assert_eq!(table.n_obs(), 6);
        assert_eq!(table.spec(), &spec);
    }

    #[test]
    fn check_three_level_factor() {
        // 2 x 3 design, 2 replicates per cell
        let diets = ["Chow", "HFD"];
        let genos = ["WT", "Het", "KO"];
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut y = Vec::new();
        for (i, d) in diets.iter().enumerate() {
            for (j, g) in genos.iter().enumerate() {
                for r in 0..2 {
                    a.push(*d);
                    b.push(*g);
                    y.push(i as f64 * 3.0 + j as f64 + r as f64 * 0.5);
                }
            }
        }
        let fa = factor("Diet", &a);
        let fb = factor("Genotype", &b);
        let spec = ModelSpec::two_way("Expression", "Diet", "Genotype");
        let table = type_ii_anova(&y, &[&fa, &fb], &spec, &AnovaConfig::default()).unwrap();
        let rows = table.rows();

        assert_eq!(rows[0].df, 1.0);
        assert_eq!(rows[1].df, 2.0);
        assert_eq!(rows[2].df, 2.0);
        assert_eq!(rows[3].df, 6.0);
        // additive by construction
        assert_abs_diff_eq!(rows[2].sum_sq, 0.0, epsilon = 1e-9);
        // within-cell spread of 0.5 -> 0.125 per cell, 6 cells
        assert_abs_diff_eq!(rows[3].sum_sq, 0.75, epsilon = 1e-9);
    }

    #[test]
    fn check_rank_tolerance_override() {
        // A huge tolerance collapses every singular value, making the design look singular
        let y = [1.0, 3.0, 3.0, 5.0, 5.0, 7.0, 11.0, 13.0];
        let a = factor("a", &["p", "p", "p", "p", "q", "q", "q", "q"]);
        let b = factor("b", &["x", "x", "y", "y", "x", "x", "y", "y"]);
        let spec = ModelSpec::two_way("y", "a", "b");
        let config = AnovaConfig::default().with_rank_tolerance(1e6);
        let err = type_ii_anova(&y, &[&a, &b], &spec, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnovaError>(),
            Some(AnovaError::SingularDesign { rank: 0, columns: 4 })
        ));
    }

    #[test]
    fn check_negative_rank_tolerance_is_rejected() {
        let y = [1.0, 3.0, 3.0, 5.0, 5.0, 7.0, 11.0, 13.0];
        let a = factor("a", &["p", "p", "p", "p", "q", "q", "q", "q"]);
        let b = factor("b", &["x", "x", "y", "y", "x", "x", "y", "y"]);
        let spec = ModelSpec::two_way("y", "a", "b");
        for tolerance in [-1.0, f64::NAN] {
            let config = AnovaConfig::default().with_rank_tolerance(tolerance);
            let err = type_ii_anova(&y, &[&a, &b], &spec, &config).unwrap_err();
            assert!(err.to_string().contains("Rank tolerance"));
        }
    }
}

//! End-to-end run of the ETF studies on synthetic data, through the CSV
//! outputs into the report.

use factorlab::StudyConfig;
use factorlab::data::french::{FF5_COLUMNS, FactorTable, parse_deciles, parse_factor_table};
use factorlab::data::{Month, MonthlySeries};
use factorlab::output::Table;
use factorlab::reports::write_q2_report;
use factorlab::studies::{self, files, ff6, long_leg, methodology, other_etfs, umd_beta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

const MONTHS: usize = 72;

struct Market {
    months: Vec<Month>,
    mkt: Vec<f64>,
    umd: Vec<f64>,
    ff5: FactorTable,
    deciles_text: String,
}

fn noise(rng: &mut StdRng, scale: f64) -> f64 {
    (rng.r#gen::<f64>() - 0.5) * 2.0 * scale
}

fn market(seed: u64) -> Market {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut month = Month::new(2017, 1).unwrap();
    let mut months = Vec::new();
    let mut mkt = Vec::new();
    let mut umd = Vec::new();
    let mut ff5_text = String::from("Fama/French 5 Factors (2x3)\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n");
    let mut vw = String::from(
        "  Average Value Weighted Returns -- Monthly\n,Lo PRIOR,PRIOR 2,PRIOR 3,PRIOR 4,PRIOR 5,PRIOR 6,PRIOR 7,PRIOR 8,PRIOR 9,Hi PRIOR\n",
    );
    let mut ew = String::from(
        "  Average Equal Weighted Returns -- Monthly\n,Lo PRIOR,PRIOR 2,PRIOR 3,PRIOR 4,PRIOR 5,PRIOR 6,PRIOR 7,PRIOR 8,PRIOR 9,Hi PRIOR\n",
    );
    for _ in 0..MONTHS {
        let key = format!("{:04}{:02}", month.year(), month.month());
        let m = noise(&mut rng, 4.0);
        let u = noise(&mut rng, 4.0);
        let others: Vec<String> = (0..4).map(|_| format!("{:.2}", noise(&mut rng, 2.0))).collect();
        ff5_text.push_str(&format!("{key},{m:.2},{},0.10\n", others.join(",")));
        let m = (m * 100.0).round() / 100.0;
        months.push(month);
        mkt.push(m / 100.0);
        umd.push(u / 100.0);

        // deciles: market plus half of UMD on each side
        let decile = |i: usize, rng: &mut StdRng| {
            let tilt = (i as f64 - 5.5) / 4.5 * u / 2.0;
            format!("{:.2}", m + tilt + noise(rng, 0.3))
        };
        let row: Vec<String> = (1..=10).map(|i| decile(i, &mut rng)).collect();
        vw.push_str(&format!("{key},{}\n", row.join(",")));
        let row: Vec<String> = (1..=10).map(|i| decile(i, &mut rng)).collect();
        ew.push_str(&format!("{key},{}\n", row.join(",")));
        month = month.succ();
    }
    ff5_text.push_str("\n Annual Factors: January-December\n");
    Market {
        months,
        mkt,
        umd,
        ff5: parse_factor_table(&ff5_text, &FF5_COLUMNS).unwrap(),
        deciles_text: format!("{vw}\n{ew}\n"),
    }
}

fn etf(name: &str, market: &Market, beta_umd: f64, seed: u64) -> MonthlySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    MonthlySeries::from_pairs(
        name,
        market.months.iter().enumerate().map(|(i, m)| {
            (
                *m,
                0.001 + 0.0005 + market.mkt[i] + beta_umd * market.umd[i] + noise(&mut rng, 0.003),
            )
        }),
    )
}

fn out_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("factorlab-pipeline-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn studies_feed_the_report() {
    let market = market(2024);
    let config = StudyConfig::default();
    let out = out_dir();
    let umd = MonthlySeries::from_pairs(
        studies::UMD,
        market.months.iter().copied().zip(market.umd.iter().copied()),
    );
    let spmo = etf("SPMO", &market, 0.27, 1);

    let q1 = umd_beta::run(&spmo, &umd, &market.ff5, &config).unwrap();
    assert!((q1.beta_umd() - 0.27).abs() < 0.05);
    q1.write_outputs(&out).unwrap();

    methodology::run(&out, config.predicted_beta)
        .unwrap()
        .write_outputs(&out)
        .unwrap();

    let deciles = parse_deciles(&market.deciles_text).unwrap();
    long_leg::run(&spmo, &umd, &deciles)
        .unwrap()
        .write_outputs(&out)
        .unwrap();

    ff6::run(&spmo, &umd, &market.ff5)
        .unwrap()
        .write_outputs(&out)
        .unwrap();

    let factors = studies::ff6_panel(&market.ff5, &umd).unwrap();
    let mut others = other_etfs::OtherEtfsStudy::default();
    for (i, spec) in config.other_etfs.iter().enumerate() {
        let returns = etf(&spec.ticker, &market, 0.4, 10 + i as u64);
        others.add(spec.clone(), Ok::<_, String>(returns), &factors);
    }
    others.write_outputs(&out).unwrap();

    for file in [
        files::UMD_BETA_SUMMARY,
        files::UMD_BETA_DATA,
        files::UMD_BETA_FIGURE,
        files::METHODOLOGY,
        files::LONG_LEG_MODELS,
        files::LONG_LEG_PORTFOLIOS,
        files::LONG_LEG_FIGURE,
        files::FF6_RESULTS,
        files::OTHER_ETFS,
    ] {
        assert!(out.join(file).is_file(), "{file} not written");
    }

    let summary = Table::read_csv(&out.join(files::UMD_BETA_SUMMARY)).unwrap();
    assert_eq!(summary.metric("N").and_then(|c| c.as_f64()), Some(MONTHS as f64));

    let written = write_q2_report(&out, &config).unwrap();
    assert_eq!(written.len(), 2);
    let md = std::fs::read_to_string(out.join(files::REPORT_MD)).unwrap();
    assert!(!md.contains("to populate"), "report still has placeholders:\n{md}");
    assert!(md.contains(files::UMD_BETA_FIGURE));
    assert!(md.contains(files::LONG_LEG_FIGURE));
    assert!(md.contains("**MTUM** (iShares MSCI USA Momentum Factor ETF): Mkt-RF ≈"));
    assert!(md.contains("**QMOM** (Alpha Architect US Quantitative Momentum ETF): Mkt-RF ≈"));
    assert!(out.join(files::REPORT_PDF).is_file());
}

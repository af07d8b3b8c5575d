//! Event tables recorded while simulations run.

#![cfg(feature = "instrument")]

use auction_core::agents::RandomBidder;
use auction_core::instrument::{self, DataFrameSubscriber, ScopedRecorder};
use auction_core::{
    MultiItemSimulation, Simulation, SimulationConfig, bid_rows, bid_rows_frame, wins_by_agent,
};
use polars::prelude::*;
use tracing::subscriber::with_default;

fn col_u64(df: &DataFrame, name: &str) -> Vec<u64> {
    df.column(name)
        .unwrap()
        .u64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn col_i64(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn col_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn random_sim(seed: u64, agents: u32) -> Simulation<RandomBidder> {
    Simulation::from_config(
        &SimulationConfig::with_seed(seed),
        RandomBidder::roster(0, agents, seed + 1),
    )
    .unwrap()
}

#[test]
fn clear_events_mirror_history() {
    instrument::clear();
    let mut sim = random_sim(42, 3);

    with_default(DataFrameSubscriber, || {
        sim.run(12).unwrap();
    });

    let dfs = instrument::drain_to_dataframes().unwrap();
    let clear = &dfs["clear"];
    let bids = &dfs["bid"];
    assert_eq!(clear.height(), 12);
    assert_eq!(bids.height(), 36);

    let rounds = col_u64(clear, "round");
    let winners = col_i64(clear, "winner");
    let prices = col_f64(clear, "price");
    for (i, result) in sim.history().iter().enumerate() {
        assert_eq!(rounds[i], u64::from(result.round_number));
        assert_eq!(winners[i], result.winning_agent_id.map_or(-1, i64::from));
        assert_eq!(prices[i], result.winning_bid);
    }

    let logged_values = col_f64(bids, "private_value");
    let expected: Vec<f64> = sim
        .history()
        .iter()
        .flat_map(|r| r.all_bids.iter().map(|b| r.private_values[&b.agent_id]))
        .collect();
    assert_eq!(logged_values, expected);
}

#[test]
fn win_counts_agree_with_report() {
    instrument::clear();
    let mut sim = random_sim(7, 4);

    with_default(DataFrameSubscriber, || {
        sim.run(40).unwrap();
    });

    let dfs = instrument::drain_to_dataframes().unwrap();
    let wins = dfs["clear"]
        .clone()
        .lazy()
        .filter(col("winner").gt_eq(lit(0)))
        .group_by([col("winner")])
        .agg([col("round").count().alias("wins")])
        .sort(["winner"], Default::default())
        .collect()
        .unwrap();

    let winners = col_i64(&wins, "winner");
    let counts: Vec<u64> = wins
        .column("wins")
        .unwrap()
        .u32()
        .unwrap()
        .into_no_null_iter()
        .map(u64::from)
        .collect();

    let expected = wins_by_agent(sim.history());
    assert_eq!(winners.len(), expected.len());
    for (winner, count) in winners.iter().zip(&counts) {
        assert_eq!(u64::from(expected[&(*winner as u32)]), *count);
    }
}

#[test]
fn multi_item_tables_have_one_row_per_draw_and_lot() {
    instrument::clear();
    let config = SimulationConfig {
        items: 3,
        ..SimulationConfig::with_seed(9)
    };
    let mut sim = MultiItemSimulation::from_config(&config, RandomBidder::roster(0, 2, 4)).unwrap();

    with_default(DataFrameSubscriber, || {
        sim.run(5).unwrap();
    });

    let recorder = instrument::drain();
    assert_eq!(recorder.table("valuation").unwrap().row_count(), 5 * 2 * 3);
    assert_eq!(recorder.table("item_bid").unwrap().row_count(), 5 * 2 * 3);

    let lots = recorder.table("item_clear").unwrap();
    assert_eq!(lots.row_count(), 5 * 3);
    assert_eq!(lots.u64s("item_id").unwrap()[..3], [0, 1, 2]);
    assert!(recorder.table("clear").is_none());
}

#[test]
fn scoped_recorder_writes_run_directory() {
    let parent = std::env::temp_dir().join(format!("auction-core-{}", std::process::id()));
    let run_dir;
    {
        let mut rec = ScopedRecorder::new(parent.clone(), "scoped run");
        run_dir = rec.run_dir().to_path_buf();
        random_sim(3, 2).run(6).unwrap();

        let dfs = rec.get();
        assert_eq!(dfs["clear"].height(), 6);
    }

    assert_eq!(run_dir, parent.join("scoped_run"));
    assert!(run_dir.join("clear.parquet").exists());
    assert!(run_dir.join("bid.parquet").exists());
    assert!(run_dir.join("_ready").exists());

    let _ = std::fs::remove_dir_all(&parent);
}

#[test]
fn bid_rows_export_as_csv() {
    let mut sim = random_sim(11, 3);
    sim.run(4).unwrap();

    let mut df = bid_rows_frame(&bid_rows(sim.history())).unwrap();
    let path = std::env::temp_dir()
        .join(format!("auction-core-csv-{}", std::process::id()))
        .join("bids.csv");
    instrument::save_csv(&mut df, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("round,agent_id,bid_amount,private_value,won,utility")
    );
    assert_eq!(lines.count(), 12);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

/// 学習データセットの集計・ダンプツール
///
/// 使い方:
///   # パックバイナリのエントリ数と結果分布を表示
///   inspect_dataset data/*.bin
///
///   # npzアーカイブ（ルールを割り当てる）
///   inspect_dataset --format npz --rule renju data/*.npz
///
///   # デコード結果をJSONLで出力
///   inspect_dataset --json data/selfplay.bin.lz4
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use rgomoku_core::{Pos, Rule};
use tools::dataset::{
    DataEntry, Dataset, GameResult, KatagoNumpyDataset, PackedBinaryDataset,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// パックバイナリ（LZ4自動判別）
    Bin,
    /// npzテンソルアーカイブ
    Npz,
}

#[derive(Parser)]
#[command(about = "学習データセットの集計・ダンプ")]
struct Cli {
    /// 入力ファイルパス（複数指定可）
    #[arg(required = true)]
    files: Vec<String>,

    /// 入力形式
    #[arg(long, value_enum, default_value = "bin")]
    format: Format,

    /// npz入力に割り当てるルール（freestyle / standard / renju）
    #[arg(long, default_value = "freestyle")]
    rule: String,

    /// エントリをJSONLで出力する
    #[arg(long)]
    json: bool,

    /// 読み込む最大エントリ数
    #[arg(long)]
    limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// JSONL出力用の構造体
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EntryJson {
    boardsize: u8,
    rule: String,
    result: &'static str,
    ply: usize,
    position: Vec<[u8; 2]>,
    best_move: Option<[u8; 2]>,
    has_policy: bool,
}

impl EntryJson {
    fn from_entry(entry: &DataEntry) -> EntryJson {
        EntryJson {
            boardsize: entry.board_size,
            rule: entry.rule.to_string(),
            result: result_name(entry.result),
            ply: entry.position.len(),
            position: entry.position.iter().map(|p| [p.x(), p.y()]).collect(),
            best_move: if entry.best_move == Pos::NONE {
                None
            } else {
                Some([entry.best_move.x(), entry.best_move.y()])
            },
            has_policy: entry.policy.is_some(),
        }
    }
}

fn result_name(result: GameResult) -> &'static str {
    match result {
        GameResult::Win => "win",
        GameResult::Loss => "loss",
        GameResult::Draw => "draw",
    }
}

fn parse_rule(s: &str) -> Result<Rule> {
    match s {
        "freestyle" => Ok(Rule::Freestyle),
        "standard" => Ok(Rule::Standard),
        "renju" => Ok(Rule::Renju),
        _ => bail!("unknown rule: {s}"),
    }
}

// ---------------------------------------------------------------------------
// 集計
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Summary {
    total: usize,
    wins: usize,
    losses: usize,
    draws: usize,
    min_ply: Option<usize>,
    max_ply: usize,
    sum_ply: usize,
    no_best_move: usize,
}

impl Summary {
    fn add(&mut self, entry: &DataEntry) {
        self.total += 1;
        match entry.result {
            GameResult::Win => self.wins += 1,
            GameResult::Loss => self.losses += 1,
            GameResult::Draw => self.draws += 1,
        }
        let ply = entry.position.len();
        self.min_ply = Some(self.min_ply.map_or(ply, |m| m.min(ply)));
        self.max_ply = self.max_ply.max(ply);
        self.sum_ply += ply;
        if entry.best_move == Pos::NONE {
            self.no_best_move += 1;
        }
    }

    fn print(&self) {
        println!("entries: {}", self.total);
        println!(
            "results: win={} loss={} draw={}",
            self.wins, self.losses, self.draws
        );
        if self.total > 0 {
            println!(
                "ply: min={} max={} avg={:.1}",
                self.min_ply.unwrap_or(0),
                self.max_ply,
                self.sum_ply as f64 / self.total as f64
            );
        }
        println!("no_best_move: {}", self.no_best_move);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut dataset: Box<dyn Dataset> = match cli.format {
        Format::Bin => Box::new(PackedBinaryDataset::new(&cli.files)?),
        Format::Npz => Box::new(KatagoNumpyDataset::new(&cli.files, parse_rule(&cli.rule)?)?),
    };

    let mut summary = Summary::default();
    let mut entry = DataEntry::default();

    while dataset.next(Some(&mut entry))? {
        summary.add(&entry);
        if cli.json {
            println!("{}", serde_json::to_string(&EntryJson::from_entry(&entry))?);
        }
        if let Some(limit) = cli.limit {
            if summary.total >= limit {
                break;
            }
        }
    }

    if !cli.json {
        summary.print();
    }
    Ok(())
}

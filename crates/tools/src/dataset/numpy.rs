//! npzテンソルアーカイブのデータセット
//!
//! 1アーカイブにつき4つの配列を要求する：
//!
//! - `globalInputNC` [N, C] f32: チャネル5が手番（負=黒、非負=白）
//! - `binaryInputNCHWPacked` [N, C, ceil(H*W/8)] u8: ビッグエンディアンの
//!   ビットプレーン。チャネル1=手番側の石、チャネル2=相手の石
//! - `globalTargetsNC` [N, C] f32: チャネル0,1,2 = 勝/負/分の確率
//! - `policyTargetsNCMove` [N, C, H*W+1] i16: 先頭チャネルがセルごとの
//!   ロジット（末尾のパス枠は無視する）
//!
//! アーカイブは着手列ではなく盤面を保存しているため、読み出し時に
//! スキャン順で黒白交互の着手列を復元する。復元順は対局の実順序では
//! ない（学習側は着手順に依存しないこと）。

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use zip::ZipArchive;

use rgomoku_core::{Color, Pos, Rule};

use super::{DataEntry, Dataset, GameResult};

/// 方策の正規化に使うε（ゼロ除算の回避）
const POLICY_EPSILON: f32 = 1e-7;

/// npzテンソルアーカイブのストリーミングリーダ
///
/// 1アーカイブのN件をすべて返してから次のファイルへ進む。
#[derive(Debug)]
pub struct KatagoNumpyDataset {
    files: Vec<PathBuf>,
    default_rule: Rule,
    next_file_idx: usize,
    next_entry_idx: usize,

    side_to_move: Vec<Color>,
    board_input: Vec<Vec<Color>>,
    value_target: Vec<[f32; 3]>,
    policy_target: Vec<Vec<i16>>,
}

impl KatagoNumpyDataset {
    /// ファイル列からデータセットを開く
    ///
    /// アーカイブ由来のエントリにはルール情報が無いため、
    /// `rule` をすべてのエントリに割り当てる。
    pub fn new<P: AsRef<Path>>(paths: &[P], rule: Rule) -> Result<KatagoNumpyDataset> {
        ensure!(!paths.is_empty(), "no file in katago numpy dataset");

        let files: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        for path in &files {
            File::open(path).with_context(|| format!("unable to open file {}", path.display()))?;
        }

        let mut dataset = KatagoNumpyDataset {
            files,
            default_rule: rule,
            next_file_idx: 0,
            next_entry_idx: 0,
            side_to_move: Vec::new(),
            board_input: Vec::new(),
            value_target: Vec::new(),
            policy_target: Vec::new(),
        };
        dataset.next_file()?;
        Ok(dataset)
    }

    /// 次のアーカイブを読み込む。ファイル列の末尾なら `false`。
    fn next_file(&mut self) -> Result<bool> {
        self.next_entry_idx = 0;

        if self.next_file_idx == self.files.len() {
            return Ok(false);
        }
        let path = self.files[self.next_file_idx].clone();

        let file = File::open(&path)
            .with_context(|| format!("unable to open file {}", path.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("unable to open archive {}", path.display()))?;

        self.read_side_to_move(&mut archive, &path)?;
        self.read_board_input(&mut archive, &path)?;
        self.read_value_target(&mut archive, &path)?;
        self.read_policy_target(&mut archive, &path)?;

        if self.side_to_move.is_empty() {
            log::warn!("empty archive {}", path.display());
        }

        self.next_file_idx += 1;
        Ok(true)
    }

    // globalInputNC → side_to_move
    fn read_side_to_move(
        &mut self,
        archive: &mut ZipArchive<BufReader<File>>,
        path: &Path,
    ) -> Result<()> {
        let (shape, data): (Vec<u64>, Vec<f32>) = read_array(archive, "globalInputNC", path)?;
        ensure!(
            shape.len() == 2,
            "incorrect data in globalInputNC in file {}",
            path.display()
        );

        let length = shape[0] as usize;
        let num_channels = shape[1] as usize;
        ensure!(
            num_channels > 5,
            "incorrect data in globalInputNC in file {}",
            path.display()
        );

        self.side_to_move.clear();
        self.side_to_move.reserve(length);
        for i in 0..length {
            // チャネル5: 手番（負 = 黒）
            let stm_input = data[i * num_channels + 5];
            self.side_to_move.push(if stm_input < 0.0 {
                Color::Black
            } else {
                Color::White
            });
        }
        Ok(())
    }

    // binaryInputNCHWPacked → board_input
    fn read_board_input(
        &mut self,
        archive: &mut ZipArchive<BufReader<File>>,
        path: &Path,
    ) -> Result<()> {
        let (shape, data): (Vec<u64>, Vec<u8>) =
            read_array(archive, "binaryInputNCHWPacked", path)?;
        ensure!(
            shape.len() == 3,
            "incorrect data in binaryInputNCHWPacked in file {}",
            path.display()
        );

        let length = shape[0] as usize;
        let num_channels = shape[1] as usize;
        let num_bytes = shape[2] as usize;
        ensure!(
            num_channels > 2 && length == self.side_to_move.len(),
            "incorrect data in binaryInputNCHWPacked in file {}",
            path.display()
        );

        let board_size = ((num_bytes * 8) as f64).sqrt() as usize;
        let num_cells = board_size * board_size;
        ensure!(
            num_cells.div_ceil(8) <= num_bytes,
            "incorrect data in binaryInputNCHWPacked in file {}",
            path.display()
        );

        let stride = num_channels * num_bytes;
        let mut self_bits = vec![0u8; num_cells];
        let mut oppo_bits = vec![0u8; num_cells];

        self.board_input.clear();
        self.board_input.reserve(length);
        for i in 0..length {
            // チャネル1: 手番側の石 / チャネル2: 相手の石
            let self_bytes = &data[i * stride + num_bytes..];
            let oppo_bytes = &data[i * stride + 2 * num_bytes..];
            unpack_bytes_to_bits(self_bytes, num_cells, &mut self_bits);
            unpack_bytes_to_bits(oppo_bytes, num_cells, &mut oppo_bits);

            let stm = self.side_to_move[i];
            let mut cells = Vec::with_capacity(num_cells);
            for j in 0..num_cells {
                cells.push(if self_bits[j] != 0 {
                    stm
                } else if oppo_bits[j] != 0 {
                    !stm
                } else {
                    Color::Empty
                });
            }
            self.board_input.push(cells);
        }
        Ok(())
    }

    // globalTargetsNC → value_target
    fn read_value_target(
        &mut self,
        archive: &mut ZipArchive<BufReader<File>>,
        path: &Path,
    ) -> Result<()> {
        let (shape, data): (Vec<u64>, Vec<f32>) = read_array(archive, "globalTargetsNC", path)?;
        ensure!(
            shape.len() == 2,
            "incorrect data in globalTargetsNC in file {}",
            path.display()
        );

        let length = shape[0] as usize;
        let num_channels = shape[1] as usize;
        ensure!(
            num_channels >= 3 && length == self.side_to_move.len(),
            "incorrect data in globalTargetsNC in file {}",
            path.display()
        );

        self.value_target.clear();
        self.value_target.reserve(length);
        for i in 0..length {
            // チャネル0,1,2: 勝ち/負け/引き分けの確率
            self.value_target.push([
                data[i * num_channels],
                data[i * num_channels + 1],
                data[i * num_channels + 2],
            ]);
        }
        Ok(())
    }

    // policyTargetsNCMove → policy_target
    fn read_policy_target(
        &mut self,
        archive: &mut ZipArchive<BufReader<File>>,
        path: &Path,
    ) -> Result<()> {
        let (shape, data): (Vec<u64>, Vec<i16>) =
            read_array(archive, "policyTargetsNCMove", path)?;
        ensure!(
            shape.len() == 3,
            "incorrect data in policyTargetsNCMove in file {}",
            path.display()
        );

        let length = shape[0] as usize;
        let num_channels = shape[1] as usize;
        ensure!(
            shape[2] >= 1 && num_channels >= 1 && length == self.side_to_move.len(),
            "incorrect data in policyTargetsNCMove in file {}",
            path.display()
        );
        // 末尾の1要素はパス枠
        let num_cells = shape[2] as usize - 1;

        let stride = num_channels * (num_cells + 1);
        self.policy_target.clear();
        self.policy_target.reserve(length);
        for i in 0..length {
            // 先頭チャネルのみ使う
            self.policy_target
                .push(data[i * stride..i * stride + num_cells].to_vec());
        }
        Ok(())
    }
}

impl Dataset for KatagoNumpyDataset {
    fn next(&mut self, entry: Option<&mut DataEntry>) -> Result<bool> {
        // エントリ列の末尾に達していたら次のアーカイブへ
        while self.next_entry_idx == self.side_to_move.len() {
            if !self.next_file()? {
                return Ok(false);
            }
        }

        let i = self.next_entry_idx;
        self.next_entry_idx += 1;

        let Some(entry) = entry else {
            return Ok(true);
        };

        let board = std::mem::take(&mut self.board_input[i]);
        let policy_raw = std::mem::take(&mut self.policy_target[i]);
        let num_cells = board.len();
        let board_size = (num_cells as f64).sqrt() as usize;

        entry.board_size = board_size as u8;
        entry.rule = self.default_rule;
        entry.position = board_array_to_pos_sequence(&board, board_size);

        // 勝/負/分の最大値で結果を決める（同率は勝→負→分の順で優先）
        let value = self.value_target[i];
        let mut best_idx = 0;
        for k in 1..3 {
            if value[k] > value[best_idx] {
                best_idx = k;
            }
        }
        entry.result = match best_idx {
            0 => GameResult::Win,
            1 => GameResult::Loss,
            _ => GameResult::Draw,
        };

        // 方策: 正規化前のロジットのargmaxを最善手とし、L1正規化して格納
        let mut policy = vec![0.0f32; num_cells];
        let mut policy_sum = 0.0f32;
        let mut max_idx = 0;
        for (j, &logit) in policy_raw.iter().enumerate() {
            let p = logit as f32;
            policy[j] = p;
            policy_sum += p;
            if p > policy[max_idx] {
                max_idx = j;
            }
        }
        let inv_sum = 1.0 / (policy_sum + POLICY_EPSILON);
        for p in policy.iter_mut() {
            *p *= inv_sum;
        }
        entry.policy = Some(policy.into_boxed_slice());
        entry.best_move = Pos::new((max_idx % board_size) as u8, (max_idx / board_size) as u8);

        Ok(true)
    }

    fn reset(&mut self) -> Result<()> {
        self.next_file_idx = 0;
        self.next_entry_idx = 0;
        self.side_to_move.clear();
        self.board_input.clear();
        self.value_target.clear();
        self.policy_target.clear();
        self.next_file()?;
        Ok(())
    }
}

// =============================================================================
// ヘルパ
// =============================================================================

/// アーカイブから配列を1つ読む
///
/// エントリ名は `name` そのもの、または `name.npy` を探す。
fn read_array<T: npyz::Deserialize>(
    archive: &mut ZipArchive<BufReader<File>>,
    name: &str,
    path: &Path,
) -> Result<(Vec<u64>, Vec<T>)> {
    let with_suffix = format!("{name}.npy");
    let entry_name = archive
        .file_names()
        .find(|n| *n == name || *n == with_suffix)
        .map(String::from)
        .with_context(|| format!("unable to open {} in file {}", name, path.display()))?;

    let file = archive
        .by_name(&entry_name)
        .with_context(|| format!("unable to open {} in file {}", name, path.display()))?;
    let npy = npyz::NpyFile::new(BufReader::new(file))
        .with_context(|| format!("incorrect data in {} in file {}", name, path.display()))?;
    let shape = npy.shape().to_vec();
    let data = npy
        .into_vec::<T>()
        .with_context(|| format!("incorrect data in {} in file {}", name, path.display()))?;
    Ok((shape, data))
}

/// バイト列をビッグエンディアンでビット列に展開する
///
/// 出力の bit 0 は先頭バイトの最上位ビット。
fn unpack_bytes_to_bits(bytes: &[u8], num_bits: usize, bits: &mut [u8]) {
    let num_bytes_floored = num_bits / 8;
    let num_bits_remained = num_bits % 8;

    for byte_idx in 0..num_bytes_floored {
        let byte = bytes[byte_idx];
        for i in 0..8 {
            bits[byte_idx * 8 + i] = (byte >> (7 - i)) & 0x1;
        }
    }

    if num_bits_remained > 0 {
        let byte = bytes[num_bytes_floored];
        for bit_idx in 0..num_bits_remained {
            bits[num_bytes_floored * 8 + bit_idx] = (byte >> (7 - bit_idx)) & 0x1;
        }
    }
}

/// 盤面配列をスキャン順の着手列に変換する（順序は任意）
///
/// 黒が先手なので黒白交互に並べ、黒が1手多い場合は末尾に置く。
fn board_array_to_pos_sequence(board: &[Color], board_size: usize) -> Vec<Pos> {
    let mut black_pos = Vec::new();
    let mut white_pos = Vec::new();
    for (i, &color) in board.iter().enumerate() {
        let pos = Pos::new((i % board_size) as u8, (i / board_size) as u8);
        match color {
            Color::Black => black_pos.push(pos),
            Color::White => white_pos.push(pos),
            Color::Empty => {}
        }
    }

    debug_assert!(black_pos.len() as i64 - white_pos.len() as i64 <= 1);

    let num_common = black_pos.len().min(white_pos.len());
    let mut sequence = Vec::with_capacity(black_pos.len() + white_pos.len());
    for i in 0..num_common {
        sequence.push(black_pos[i]);
        sequence.push(white_pos[i]);
    }
    if black_pos.len() > num_common {
        sequence.push(black_pos[num_common]);
    }
    sequence
}

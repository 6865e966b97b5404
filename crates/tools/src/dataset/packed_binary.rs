//! パックバイナリ形式のデータセット
//!
//! レコードは4バイトのビットパックヘッダと16bit着手列の連接：
//!
//! ```text
//! header (32bit LE): result:2 | ply:9 | boardsize:5 | rule:3 | move:13
//! moves  (ply × 16bit LE): 下位10bitが (x << 5) | y
//! ```
//!
//! `move` フィールドは `(boardsize, boardsize)` を「最善手なし」の
//! 番兵として使う。ファイルはそのまま、または LZ4 フレームで
//! 圧縮されていてよい（先頭4バイトのマジックで自動判別）。

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use rgomoku_core::types::MOVE_INDEX_SIZE;
use rgomoku_core::{Pos, Rule};

use super::{DataEntry, Dataset, GameResult};

/// LZ4フレームのマジックナンバー（リトルエンディアン）
const LZ4_FRAME_MAGIC: u32 = 0x184D2204;

// =============================================================================
// 読み出し
// =============================================================================

/// パックバイナリ形式のストリーミングリーダ
///
/// 複数ファイルを連結して1つのエントリ列として読む。ファイル末尾に
/// 達したら次のファイルへ透過的に進み、全ファイルを読み終えたら
/// `next` が `false` を返す。
pub struct PackedBinaryDataset {
    files: Vec<PathBuf>,
    next_idx: usize,
    stream: Option<Box<dyn BufRead>>,
}

impl std::fmt::Debug for PackedBinaryDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedBinaryDataset")
            .field("files", &self.files)
            .field("next_idx", &self.next_idx)
            .field("stream", &self.stream.is_some())
            .finish()
    }
}

impl PackedBinaryDataset {
    /// ファイル列からデータセットを開く
    ///
    /// 全ファイルが開けることを最初に確認する。
    pub fn new<P: AsRef<Path>>(paths: &[P]) -> Result<PackedBinaryDataset> {
        ensure!(!paths.is_empty(), "no file in binary dataset");

        let files: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        for path in &files {
            File::open(path).with_context(|| format!("unable to open file {}", path.display()))?;
        }

        let mut dataset = PackedBinaryDataset { files, next_idx: 0, stream: None };
        dataset.advance_file()?;
        Ok(dataset)
    }

    /// 先頭4バイトのマジックで圧縮を判別してストリームを開く
    ///
    /// マジック確認後はファイルポインタを先頭に巻き戻し、
    /// ヘッダがストリームに残るようにする。
    fn open_stream(path: &Path) -> Result<Box<dyn BufRead>> {
        let mut file =
            File::open(path).with_context(|| format!("unable to open file {}", path.display()))?;

        let mut magic = [0u8; 4];
        let n = read_up_to(&mut file, &mut magic)
            .with_context(|| format!("unable to read file {}", path.display()))?;
        file.seek(SeekFrom::Start(0))
            .with_context(|| format!("unable to rewind file {}", path.display()))?;

        let stream: Box<dyn BufRead> = if n == 4 && u32::from_le_bytes(magic) == LZ4_FRAME_MAGIC {
            Box::new(BufReader::new(FrameDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(stream)
    }

    /// 次のファイルのストリームを開く。ファイル列の末尾なら `false`。
    fn advance_file(&mut self) -> Result<bool> {
        self.stream = None;
        if self.next_idx == self.files.len() {
            return Ok(false);
        }
        self.stream = Some(Self::open_stream(&self.files[self.next_idx])?);
        self.next_idx += 1;
        Ok(true)
    }
}

impl Dataset for PackedBinaryDataset {
    fn next(&mut self, entry: Option<&mut DataEntry>) -> Result<bool> {
        // 現在のストリームがEOFなら次のファイルへ進む
        loop {
            match self.stream.as_mut() {
                None => return Ok(false),
                Some(stream) => {
                    let at_eof = stream
                        .fill_buf()
                        .context("unable to read dataset stream")?
                        .is_empty();
                    if !at_eof {
                        break;
                    }
                }
            }
            if !self.advance_file()? {
                return Ok(false);
            }
        }

        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };
        read_record(stream, entry)?;
        Ok(true)
    }

    fn reset(&mut self) -> Result<()> {
        self.next_idx = 0;
        self.advance_file()?;
        Ok(())
    }
}

/// 残量が足りなくてもエラーにしない read_exact 相当
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// 1レコードを読んで検証し、`entry` に展開する
///
/// `entry` が `None` のときは着手列をストリームから読み捨てる。
fn read_record(stream: &mut dyn BufRead, entry: Option<&mut DataEntry>) -> Result<()> {
    let head_lo = stream
        .read_u16::<LittleEndian>()
        .context("unable to read entry header")?;
    let head_hi = stream
        .read_u16::<LittleEndian>()
        .context("unable to read entry header")?;

    let result_raw = (head_lo & 0x3) as u8;
    let ply = ((head_lo >> 2) & 0x1ff) as usize;
    let board_size = ((head_lo >> 11) & 0x1f) as u16;
    let rule_raw = (head_hi & 0x7) as u8;
    let move_raw = head_hi >> 3;

    ensure!(board_size != 0, "wrong boardsize in dataset");
    let Some(rule) = Rule::from_wire(rule_raw) else {
        bail!("wrong rule in dataset ({})", rule_raw);
    };
    let Some(result) = GameResult::from_wire(result_raw) else {
        bail!("wrong result in dataset ({})", result_raw);
    };
    ensure!(
        ply <= (board_size * board_size) as usize,
        "wrong ply in dataset ({} in boardsize {})",
        ply,
        board_size
    );

    let Some(entry) = entry else {
        // 着手列は読み飛ばす（ストリームからは消費する）
        let skipped = io::copy(&mut stream.take(ply as u64 * 2), &mut io::sink())
            .context("unable to skip move sequence")?;
        ensure!(skipped == ply as u64 * 2, "unexpected end of record");
        return Ok(());
    };

    entry.board_size = board_size as u8;
    entry.rule = rule;
    entry.result = result;
    entry.position.clear();
    entry.position.reserve(ply);
    entry.policy = None;

    let mut moved = [false; MOVE_INDEX_SIZE];
    for _ in 0..ply {
        let raw = stream
            .read_u16::<LittleEndian>()
            .context("unable to read move sequence")?;
        let x = (raw >> 5) & 0x1f;
        let y = raw & 0x1f;
        ensure!(
            x < board_size && y < board_size,
            "wrong move sequence in dataset ([{},{}] in boardsize {})",
            x,
            y,
            board_size
        );

        let pos = Pos::new(x as u8, y as u8);
        ensure!(!moved[pos.move_index()], "duplicate move in sequence ({})", pos);
        moved[pos.move_index()] = true;
        entry.position.push(pos);
    }

    let best_x = (move_raw >> 5) & 0x1f;
    let best_y = move_raw & 0x1f;
    if best_x == board_size && best_y == board_size {
        // 「最善手なし」の番兵
        entry.best_move = Pos::NONE;
    } else {
        ensure!(
            best_x < board_size && best_y < board_size,
            "wrong best move in dataset ([{},{}] in boardsize {})",
            best_x,
            best_y,
            board_size
        );
        let best = Pos::new(best_x as u8, best_y as u8);
        ensure!(
            !moved[best.move_index()],
            "wrong best move in dataset ({} already played)",
            best
        );
        entry.best_move = best;
    }

    Ok(())
}

// =============================================================================
// 書き込み
// =============================================================================

enum WriterImpl {
    Plain(BufWriter<File>),
    Lz4(FrameEncoder<BufWriter<File>>),
}

impl WriterImpl {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            WriterImpl::Plain(w) => w,
            WriterImpl::Lz4(w) => w,
        }
    }
}

/// パックバイナリ形式のライタ
///
/// リーダと同じレコード形式で書き出す。`compress` を指定すると
/// LZ4フレームで包む（リーダ側はマジックで自動判別する）。
#[must_use = "call .finish() to flush compressed output"]
pub struct PackedBinaryWriter {
    out: WriterImpl,
}

impl PackedBinaryWriter {
    /// 出力ファイルを作る
    pub fn create<P: AsRef<Path>>(path: P, compress: bool) -> Result<PackedBinaryWriter> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("unable to create file {}", path.display()))?;
        let out = if compress {
            WriterImpl::Lz4(FrameEncoder::new(BufWriter::new(file)))
        } else {
            WriterImpl::Plain(BufWriter::new(file))
        };
        Ok(PackedBinaryWriter { out })
    }

    /// 1エントリを書き出す
    pub fn write_entry(&mut self, entry: &DataEntry) -> Result<()> {
        let board_size = entry.board_size as u16;
        ensure!(board_size != 0 && board_size < 32, "wrong boardsize in entry");
        ensure!(
            entry.position.len() <= (board_size * board_size) as usize && entry.position.len() < 512,
            "too long move sequence in entry"
        );
        for &pos in &entry.position {
            ensure!(
                (pos.x() as u16) < board_size && (pos.y() as u16) < board_size,
                "wrong move in entry ({})",
                pos
            );
        }

        let best_raw = if entry.best_move == Pos::NONE {
            (board_size << 5) | board_size
        } else {
            ensure!(
                (entry.best_move.x() as u16) < board_size
                    && (entry.best_move.y() as u16) < board_size,
                "wrong best move in entry ({})",
                entry.best_move
            );
            entry.best_move.move_index() as u16
        };

        let head_lo = entry.result.to_wire() as u16
            | ((entry.position.len() as u16) << 2)
            | (board_size << 11);
        let head_hi = entry.rule.to_wire() as u16 | (best_raw << 3);

        let w = self.out.writer();
        w.write_u16::<LittleEndian>(head_lo)
            .context("unable to write entry header")?;
        w.write_u16::<LittleEndian>(head_hi)
            .context("unable to write entry header")?;
        for &pos in &entry.position {
            w.write_u16::<LittleEndian>(pos.move_index() as u16)
                .context("unable to write move sequence")?;
        }
        Ok(())
    }

    /// ストリームを確定してフラッシュする
    pub fn finish(self) -> Result<()> {
        match self.out {
            WriterImpl::Plain(mut w) => w.flush().context("unable to flush output")?,
            WriterImpl::Lz4(w) => {
                let mut inner = w.finish().context("unable to finish lz4 stream")?;
                inner.flush().context("unable to flush output")?;
            }
        }
        Ok(())
    }
}

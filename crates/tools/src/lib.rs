//! 学習データ用ツール
//!
//! 自己対局データの読み書き（パックバイナリ形式・npzテンソルアーカイブ）を提供する。

pub mod dataset;

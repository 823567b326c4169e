//! imgpack-core
//!
//! リモート画像をまとめて取得し、1 つの ZIP にして期限付きで保存するためのコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, entry, outcome, artifact, errors）
//! - **ports**: 抽象化レイヤー（RemoteFetcher, ArtifactStore, Clock, IdGenerator）
//! - **impls**: 実装（ReqwestFetcher, LocalArtifactStore, 開発用の StaticFetcher）
//! - **app**: アプリケーションロジック（orchestrator, archive_builder, pipeline, gc_loop）
//!
//! # 並行ドメイン
//! 1. fetch タスク（上限付きプール）
//! 2. ZIP を書く単一の writer スレッド
//! 3. 定期的な GC タスク
//!
//! 3 つが共有するのは結果チャネルと store の名前空間だけです。

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

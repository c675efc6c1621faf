use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("セッションエラー: {0}")]
    Session(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("検索エラー: {0}")]
    Search(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),
}

impl ScraperError {
    /// ブラウザとの接続自体が失われたか（実行全体を中断する）
    pub fn is_session_lost(&self) -> bool {
        matches!(self, ScraperError::Session(_))
    }
}

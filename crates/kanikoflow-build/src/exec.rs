//! キャンセル可能な実行コンテキスト
//!
//! 呼び出し側が渡す [`ExecContext`] はキャンセルトークンと任意のデッドラインを持ち、
//! 長くかかる処理（依存ファイルの走査など）はこれに従って途中で打ち切られます。

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 処理が打ち切られた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 今から `timeout` 後をデッドラインとするコンテキスト
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// 既存のデッドラインより早い場合のみ置き換える
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// 親のキャンセルが伝播する子コンテキスト
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 既に打ち切られていれば、その理由を返す
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// キャンセルまたはデッドライン到達まで待つ
    pub async fn done(&self) -> Interrupted {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => Interrupted::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Interrupted::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                Interrupted::Cancelled
            }
        }
    }

    /// `fut` をキャンセル・デッドラインと競争させる
    ///
    /// 打ち切られた場合 `fut` は drop され、結果は返らない。
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        self.check()?;

        let output = tokio::select! {
            biased;
            reason = self.done() => return Err(reason),
            output = fut => output,
        };

        self.check()?;
        Ok(output)
    }
}

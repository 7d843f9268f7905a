use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 固定间隔的重试策略
///
/// `max_attempts` 是尝试总次数（包含第一次），最小为 1。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// 所有尝试均失败
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// 只尝试一次
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// 执行操作，失败时等待固定间隔后重试。
    ///
    /// # 参数
    ///
    /// * `label` - 日志中标识操作对象的字符串（文件 ID 或对象键）。
    /// * `operation` - 每次尝试调用一次，参数为从 1 开始的尝试序号。
    ///
    /// # 返回值
    ///
    /// 第一次成功的结果；全部失败时返回尝试次数和最后一次的错误。
    /// 最后一次失败后不再等待。
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} failed for {}. Error: {}. Retrying in {:?}...",
                        attempt, self.max_attempts, label, error, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    /// 测试失败两次后第三次成功
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result = policy
            .run("file-1", move |_| async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call < 3 { Err("boom") } else { Ok(call) }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 两次重试之间各等待一次
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    /// 测试耗尽所有尝试
    async fn test_exhausts_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("file-1", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure #{attempt}")) }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "failure #3");
        // 不会发起第四次调用
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry() {
        let policy = RetryPolicy::no_retry();
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("key", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("denied")
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}

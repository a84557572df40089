//! Bounded retry decorator for daemon clients.

use super::{ClientResult, ResultMeta, RowCursor, SearchClient, SqlValue};
use crate::config::SearchConfig;
use log::warn;
use std::time::Duration;

/// Wraps a client and retries connection failures with a fixed delay.
///
/// Non-connection errors and the last failure are returned untouched.
pub struct RetryingClient<C> {
    inner: C,
    retries: u32,
    delay: Duration,
}

impl<C: SearchClient> RetryingClient<C> {
    pub fn new(inner: C, retries: u32, delay: Duration) -> Self {
        Self {
            inner,
            retries,
            delay,
        }
    }

    pub fn from_config(inner: C, config: &SearchConfig) -> Self {
        Self::new(inner, config.retries, config.retry_delay())
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn with_retries<T>(&self, op: &str, mut call: impl FnMut() -> ClientResult<T>) -> ClientResult<T> {
        let mut attempt = 0;
        loop {
            match call() {
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "event=client_retry module=client status=warn op={} attempt={} max_retries={} error={}",
                        op, attempt, self.retries, err
                    );
                    std::thread::sleep(self.delay);
                }
                result => return result,
            }
        }
    }
}

impl<C: SearchClient> SearchClient for RetryingClient<C> {
    fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> ClientResult<(Box<dyn RowCursor>, ResultMeta)> {
        self.with_retries("execute", || self.inner.execute(sql, args))
    }

    fn call_snippets(&self, sql: &str, args: &[SqlValue]) -> ClientResult<Vec<String>> {
        self.with_retries("call_snippets", || self.inner.call_snippets(sql, args))
    }
}

#[cfg(test)]
mod tests {
    use super::RetryingClient;
    use crate::client::{
        ClientError, ClientResult, ResultMeta, RowCursor, SearchClient, SqlValue, VecCursor,
    };
    use std::cell::Cell;
    use std::time::Duration;

    struct FlakyClient {
        failures: Cell<u32>,
        calls: Cell<u32>,
        error: ClientError,
    }

    impl FlakyClient {
        fn new(failures: u32, error: ClientError) -> Self {
            Self {
                failures: Cell::new(failures),
                calls: Cell::new(0),
                error,
            }
        }
    }

    impl SearchClient for FlakyClient {
        fn execute(
            &self,
            _sql: &str,
            _args: &[SqlValue],
        ) -> ClientResult<(Box<dyn RowCursor>, ResultMeta)> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(self.error.clone());
            }
            Ok((Box::new(VecCursor::default()), ResultMeta::empty()))
        }

        fn call_snippets(&self, _sql: &str, _args: &[SqlValue]) -> ClientResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn retries_connection_failures_until_success() {
        let client = RetryingClient::new(
            FlakyClient::new(2, ClientError::Connection("refused".to_string())),
            3,
            Duration::ZERO,
        );
        assert!(client.execute("SELECT 1", &[]).is_ok());
        assert_eq!(client.inner().calls.get(), 3);
    }

    #[test]
    fn gives_up_after_configured_retries() {
        let client = RetryingClient::new(
            FlakyClient::new(5, ClientError::Connection("refused".to_string())),
            1,
            Duration::ZERO,
        );
        let err = client.execute("SELECT 1", &[]).err().expect("should fail");
        assert!(matches!(err, ClientError::Connection(_)));
        assert_eq!(client.inner().calls.get(), 2);
    }

    #[test]
    fn does_not_retry_execution_errors() {
        let client = RetryingClient::new(
            FlakyClient::new(
                1,
                ClientError::Execution {
                    statement: "SELECT".to_string(),
                    message: "syntax".to_string(),
                },
            ),
            3,
            Duration::ZERO,
        );
        assert!(client.execute("SELECT", &[]).is_err());
        assert_eq!(client.inner().calls.get(), 1);
    }
}

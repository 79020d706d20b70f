/// Turns a `Result` into an `Option`, logging the error instead of propagating it.
///
/// Used wherever a failure must degrade to "metric unavailable" rather than abort
/// the validation run.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error at `error` level and returns `None`.
    fn ok_log(self) -> Option<T>;

    /// Logs the error at `warn` level and returns `None`.
    fn ok_warn(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn ok_warn(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_ok_log_passes_value_through() {
        let res: Result<u32, Boom> = Ok(7);
        assert_eq!(res.ok_log(), Some(7));
    }

    #[test]
    fn test_ok_log_swallows_error() {
        let res: Result<u32, Boom> = Err(Boom);
        assert_eq!(res.ok_log(), None);
        let res: Result<u32, Boom> = Err(Boom);
        assert_eq!(res.ok_warn(), None);
    }
}

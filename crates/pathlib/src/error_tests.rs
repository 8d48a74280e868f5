/* 📖 # Why use a separate file for these error tests?

The span trace tests capture line numbers of this file. Keeping them out of error.rs keeps
those numbers stable when the error module changes.
*/

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::{PathlibError, PathlibResult, ResultExt};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;
    use tracing::span;
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    /// Set up tracing with ErrorLayer for tests.
    /// Uses `try_init()` to handle multiple tests running concurrently.
    fn setup_tracing_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .try_init();
    }

    fn not_found(path: &str) -> PathlibError {
        PathlibError::file(path, io::Error::new(io::ErrorKind::NotFound, "not found"))
    }

    #[test]
    fn test_file_error_keeps_path_and_source() {
        let error = not_found("data/a.txt");

        match error.kind() {
            ErrorKind::FileError { path, source } => {
                assert_eq!(path, &PathBuf::from("data/a.txt"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError variant"),
        }
        assert_eq!(error.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_io_kind_found_through_cause() {
        let error = PathlibError::message("get parent failed").caused_by(not_found("x"));
        assert_eq!(error.io_kind(), Some(io::ErrorKind::NotFound));

        let error = PathlibError::message("no io here");
        assert_eq!(error.io_kind(), None);
    }

    #[test]
    fn test_display_short_write() {
        let error = PathlibError::new(ErrorKind::ShortWrite {
            path: PathBuf::from("/out.bin"),
            written: 3,
            expected: 8,
        });
        assert_eq!(error.to_string(), "Short write to /out.bin: wrote 3 of 8 bytes");
    }

    #[test]
    fn test_display_incompatible_target() {
        let error = PathlibError::new(ErrorKind::IncompatibleTarget {
            path: "/a".to_string(),
            target: "/b".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Cannot rename /a to /b: target is on a different filesystem"
        );
    }

    #[test]
    fn test_display_with_context() {
        let error = not_found("cwd").context("get cwd failed");
        assert_eq!(
            error.to_string(),
            "get cwd failed: File error at cwd: not found"
        );
    }

    #[test]
    fn test_source_and_root_cause() {
        let error = not_found("a.txt");
        assert!(error.source().is_some());
        assert_eq!(error.root_cause().to_string(), "not found");

        let wrapped = PathlibError::message("outer").caused_by(not_found("b.txt"));
        assert_eq!(wrapped.root_cause().to_string(), "not found");

        let plain = PathlibError::message("plain");
        assert!(plain.source().is_none());
        assert_eq!(plain.root_cause().to_string(), "plain");
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: PathlibResult<i32> = Err(Box::new(PathlibError::message("root")));
        let err = result
            .context("step 1")
            .with_context(|| "step 2".to_string())
            .unwrap_err();
        assert_eq!(err.get_context(), ["step 1", "step 2"]);
        assert_eq!(err.to_string(), "step 1: step 2: root");
    }

    #[test]
    fn test_result_ext_success_untouched() {
        let result: PathlibResult<i32> = Ok(42);
        assert_eq!(result.context("unused").unwrap(), 42);
    }

    #[test]
    fn test_err_and_bail_macros() {
        fn fails(name: &str) -> PathlibResult<()> {
            crate::bail!("bad name: {}", name)
        }
        let err = fails("x").unwrap_err();
        assert_eq!(err.to_string(), "bad name: x");

        let err: Box<PathlibError> = crate::err!("value {}", 7);
        assert!(matches!(err.kind(), ErrorKind::Message { message } if message == "value 7"));
    }

    #[test]
    fn test_debug_tree_without_trace() {
        let error = PathlibError::message("get parent failed")
            .context("resolving output")
            .caused_by(not_found("rel").context("get absolute failed"));

        expect![[r#"
            get parent failed
            ├─ resolving output
            └─ cause: File error at rel: not found
               └─ get absolute failed

        "#]]
        .assert_debug_eq(&error);
    }

    #[test]
    fn test_debug_includes_span_trace() {
        setup_tracing_subscriber();

        let operation_span = span!(tracing::Level::DEBUG, "write_bytes", path = "/x");
        let _guard = operation_span.enter();

        let error = PathlibError::message("short");
        let debug = format!("{:?}", error);
        assert!(debug.starts_with("short\nTrace: "));
        assert!(debug.contains("write_bytes"));
        assert!(debug.contains("path=\"/x\"") || debug.contains("path=/x"));
    }
}

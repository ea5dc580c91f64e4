//! Standard output capture
//!
//! Snippets write through [`write`], which goes to the calling thread's
//! current stdout target: the process stdout by default, or an
//! [`OutputBuffer`] while a [`Redirect`] guard is alive. The guard restores
//! whatever target was active before it, including when the run is aborted
//! by a timeout or unwinds from a panic.
//!
//! The target is per thread, so concurrent invocations on different threads
//! never see each other's output.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Append-only text sink for one invocation's output
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: Rc<RefCell<String>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&self, text: &str) {
        self.text.borrow_mut().push_str(text);
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.text.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.borrow().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
enum Target {
    #[default]
    Process,
    Buffer(OutputBuffer),
}

thread_local! {
    static STDOUT: RefCell<Target> = RefCell::new(Target::Process);
}

/// Write text to the current stdout target
pub fn write(text: &str) {
    STDOUT.with(|target| match &*target.borrow() {
        Target::Buffer(buffer) => buffer.push_str(text),
        Target::Process => {
            let mut stdout = std::io::stdout().lock();
            if let Err(err) = stdout.write_all(text.as_bytes()) {
                tracing::debug!(error = %err, "failed to write snippet output");
            }
        }
    });
}

/// Redirect this thread's stdout into `buffer` until the guard drops
pub fn redirect(buffer: OutputBuffer) -> Redirect {
    let previous = STDOUT.with(|target| target.replace(Target::Buffer(buffer)));
    Redirect {
        previous: Some(previous),
    }
}

/// Whether this thread's stdout currently goes to the process
pub fn is_process_stdout() -> bool {
    STDOUT.with(|target| matches!(&*target.borrow(), Target::Process))
}

/// Scoped stdout redirection; restores the previous target on drop
#[derive(Debug)]
pub struct Redirect {
    previous: Option<Target>,
}

impl Drop for Redirect {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            STDOUT.with(|target| {
                *target.borrow_mut() = previous;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_captures_output() {
        let buffer = OutputBuffer::new();
        {
            let _redirect = redirect(buffer.clone());
            write("hello ");
            write("world\n");
        }
        assert_eq!(buffer.contents(), "hello world\n");
        assert!(is_process_stdout());
    }

    #[test]
    fn test_nested_redirects_restore_in_order() {
        let outer = OutputBuffer::new();
        let inner = OutputBuffer::new();
        {
            let _outer = redirect(outer.clone());
            write("a");
            {
                let _inner = redirect(inner.clone());
                write("b");
            }
            write("c");
        }
        assert_eq!(outer.contents(), "ac");
        assert_eq!(inner.contents(), "b");
        assert!(is_process_stdout());
    }

    #[test]
    fn test_redirect_restored_after_panic() {
        let buffer = OutputBuffer::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _redirect = redirect(buffer.clone());
            write("partial");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(is_process_stdout());
        assert_eq!(buffer.contents(), "partial");
    }

    #[test]
    fn test_threads_have_independent_targets() {
        let buffer = OutputBuffer::new();
        let _redirect = redirect(buffer.clone());
        let other_thread_redirected = std::thread::spawn(|| !is_process_stdout())
            .join()
            .unwrap();
        assert!(!other_thread_redirected);
        assert!(!is_process_stdout());
    }
}

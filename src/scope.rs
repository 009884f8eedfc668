//! Scoped resource acquisition with reverse-order release.
//!
//! Every stream a repack run opens is registered in a [`ResourceScope`] at
//! its acquisition site. The scope releases everything in reverse
//! registration order on every exit path and never discards a close
//! failure: secondary errors are attached to the primary one, and a close
//! failure is promoted to primary only when it is the only failure present.
//!
//! Registration hands back a [`Shared`] handle so the same resource is both
//! usable by the engine and closable by the scope. The engine is strictly
//! single-threaded, so the handle uses plain `Rc<RefCell<_>>` sharing.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::{Error, Result};

/// A resource that can be released, reporting failure.
///
/// `close` is called exactly once by the owning [`ResourceScope`]. Types
/// whose drop glue is sufficient implement it as a no-op; types that flush
/// buffered state (tar writers, gzip encoders) surface their finalization
/// errors here instead of losing them in `Drop`.
pub trait Closeable {
    /// Releases the resource, flushing any buffered state.
    fn close(&mut self) -> io::Result<()>;
}

impl Closeable for File {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R> Closeable for GzDecoder<R> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T> Closeable for io::Cursor<T> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Closeable for GzEncoder<W> {
    fn close(&mut self) -> io::Result<()> {
        self.try_finish()
    }
}

impl<W: Write> Closeable for tar::Builder<W> {
    fn close(&mut self) -> io::Result<()> {
        self.finish()
    }
}

/// A handle to a scope-registered resource.
///
/// Cloning the handle is cheap; all clones refer to the same underlying
/// resource. The handle forwards `Read`/`Write`/`Seek` so stream adapters
/// can be layered over registered resources.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    fn new(value: T) -> Self {
        Shared(Rc::new(RefCell::new(value)))
    }

    /// Mutably borrows the underlying resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource is already borrowed; resources are layered
    /// one-way, so nested borrows of the same handle do not occur.
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(self.0.clone())
    }
}

impl<T: Read> Read for Shared<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.borrow_mut().read(buf)
    }
}

impl<T: Write> Write for Shared<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

impl<T: Seek> Seek for Shared<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.borrow_mut().seek(pos)
    }
}

struct Registered {
    label: String,
    resource: Rc<RefCell<dyn Closeable>>,
}

/// A last-in-first-out list of opened resources.
///
/// Resources are appended the moment each is successfully opened. Two
/// teardown paths exist:
///
/// - [`abort`][ResourceScope::abort]: setup failed partway through; every
///   resource registered so far is closed in reverse order and any close
///   failure is attached to the original error, which propagates.
/// - [`finish`][ResourceScope::finish]: scope exit after processing; all
///   resources are closed in reverse order. With a successful outcome, a
///   single close failure is returned alone, multiple failures are
///   aggregated with the first as primary, and a clean teardown is silent.
#[derive(Default)]
pub struct ResourceScope {
    stack: Vec<Registered>,
}

impl ResourceScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly opened resource and returns a handle to it.
    ///
    /// The label names the resource in release-failure messages.
    pub fn register<T: Closeable + 'static>(
        &mut self,
        label: impl Into<String>,
        resource: T,
    ) -> Shared<T> {
        let shared = Shared::new(resource);
        let handle: Rc<RefCell<dyn Closeable>> = shared.0.clone();
        self.stack.push(Registered {
            label: label.into(),
            resource: handle,
        });
        shared
    }

    /// Returns the number of currently registered resources.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns whether the scope holds no resources.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Closes all registered resources in reverse order, collecting failures.
    fn release_all(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();
        for registered in self.stack.drain(..).rev() {
            if let Err(e) = registered.resource.borrow_mut().close() {
                failures.push(Error::ReleaseFailed {
                    resource: registered.label,
                    source: e,
                });
            }
        }
        failures
    }

    /// Tears down after a setup failure.
    ///
    /// Closes everything registered so far in reverse order and returns the
    /// original error, with any close failures attached as secondary errors.
    pub fn abort(&mut self, primary: Error) -> Error {
        let failures = self.release_all();
        if failures.is_empty() {
            primary
        } else {
            Error::Teardown {
                primary: Box::new(primary),
                secondary: failures,
            }
        }
    }

    /// Tears down at scope exit and folds close failures into the outcome.
    pub fn finish<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Err(e) => Err(self.abort(e)),
            Ok(value) => {
                let mut failures = self.release_all();
                match failures.len() {
                    0 => Ok(value),
                    1 => Err(failures.remove(0)),
                    _ => {
                        let primary = failures.remove(0);
                        Err(Error::Teardown {
                            primary: Box::new(primary),
                            secondary: failures,
                        })
                    }
                }
            }
        }
    }
}

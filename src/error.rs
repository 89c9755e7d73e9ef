use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! unreachable_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Unreachable {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Unreachable {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into three groups: resolution failures (a string identifier coming from the
/// instrumentation did not name anything in the program model), type failures raised by the
/// term smart constructors, and internal consistency failures of the trace translator.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Malformed event payload or identifier text
/// - [`Error::UnknownName`] - Identifier not present in the method's name index
/// - [`Error::UnexpectedInstruction`] - Identifier resolved to the wrong instruction kind
/// - [`Error::MethodNotFound`], [`Error::ClassNotFound`], [`Error::FieldNotFound`] - Program
///   model lookups that failed
///
/// ## Term Errors
/// - [`Error::TypeError`] - Operand types rejected by a smart constructor
///
/// ## Translation Errors
/// - [`Error::Unreachable`] - Internal invariant violated, fatal for the current trace
/// - [`Error::Translation`] - Wrapper returned by every event entry point
/// - [`Error::Aborted`] - Event delivered after a fatal failure
///
/// # Examples
///
/// ```rust,ignore
/// use symtrace::{Error, trace::InstructionTraceCollector};
///
/// match translator.binary("%3", "arg$0", "arg$1", &v, &l, &r) {
///     Ok(()) => {}
///     Err(Error::Translation { event, source }) => {
///         eprintln!("{event} failed: {source}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input could not be parsed.
    ///
    /// Raised for identifier text or descriptor strings that do not follow the expected
    /// format. The error includes the source location where the problem was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A name did not resolve inside the given scope.
    #[error("Unknown identifier `{name}` in {scope}")]
    UnknownName {
        /// The identifier that failed to resolve
        name: String,
        /// Description of the scope the lookup ran in (usually a method)
        scope: String,
    },

    /// The identifier resolved, but to an instruction of a different kind than the event
    /// requires.
    #[error("Instruction `{name}` is not a {expected} instruction")]
    UnexpectedInstruction {
        /// The resolved instruction name
        name: String,
        /// The instruction kind the event handler expected
        expected: &'static str,
    },

    /// No method with the given owner, name and descriptor is registered.
    #[error("Method not found - {0}")]
    MethodNotFound(String),

    /// No class with the given name is registered.
    #[error("Class not found - {0}")]
    ClassNotFound(String),

    /// No field with the given owner, name and type is registered.
    #[error("Field not found - {0}")]
    FieldNotFound(String),

    /// A smart constructor rejected its operands.
    #[error("Type error - {0}")]
    TypeError(String),

    /// The translator reached a state it considers impossible.
    ///
    /// Examples are an exception without any matching handler on the frame stack, or a return
    /// event with an empty frame stack. These failures are fatal for the trace being
    /// translated.
    #[error("Unreachable - {file}:{line}: {message}")]
    Unreachable {
        /// Description of the violated invariant
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An event handler failed.
    ///
    /// Every public event entry point of the translator returns this variant on failure so
    /// callers only need to handle one shape, while the original cause stays available through
    /// [`std::error::Error::source`].
    #[error("Symbolic trace translation failed in `{event}`: {source}")]
    Translation {
        /// Name of the event that failed
        event: &'static str,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The translator was aborted by an earlier fatal failure and ignores further events.
    #[error("Translation was aborted by an earlier failure")]
    Aborted,

    /// Failed to lock target
    #[error("Failed to lock target")]
    LockError,

    /// JSON (de)serialization of a snapshot or a recorded trace failed.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this error, or the cause it wraps, is an internal consistency
    /// failure.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Unreachable { .. } => true,
            Error::Translation { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

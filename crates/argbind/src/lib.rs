//! argparse-style argument matching and binding.
//!
//! Declare arguments with [`Arg`] and [`ParserBuilder`], freeze them with
//! [`ParserBuilder::build`], then hand raw tokens to [`Parser::parse`]:
//!
//! ```
//! use argbind::{Action, Arg, Arity, ParseOutcome, ParserBuilder};
//!
//! let parser = ParserBuilder::new("copy")
//!     .arg(Arg::new("files").nargs(Arity::OneOrMore))
//!     .arg(Arg::new("--verbose").action(Action::StoreTrue))
//!     .arg(Arg::new("--out").required(true))
//!     .build()?;
//!
//! let ParseOutcome::Matches(bindings) =
//!     parser.parse(["--out", "result.txt", "a.txt", "b.txt", "--verbose"])?
//! else {
//!     unreachable!("no help or version flag given");
//! };
//! assert_eq!(bindings.get("out")?, Some("result.txt"));
//! assert_eq!(bindings.get_all("files")?, ["a.txt", "b.txt"]);
//! assert!(bindings.flag("verbose")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod abbrev;
mod allocate;
mod bindings;
mod classify;
mod dispatch;
mod error;
mod finalize;
pub mod help;
mod matcher;
mod parser;
mod spec;

pub use bindings::{Binding, Bindings};
pub use classify::{Classifier, SEPARATOR, TokenClass, is_negative_number};
pub use error::{AccessError, ErrorKind, Expected, ParseError, ParseResult};
pub use parser::{
    Command, LevelError, ParseOutcome, Parser, ParserBuilder, SubcommandGroup, Subcommands,
};
pub use spec::{Action, ActionKind, Arg, ArgumentKind, ArgumentSpec, Arity, Callback, IntoFlags};

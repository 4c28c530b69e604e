pub mod apertures;
pub mod coord;
pub mod interpreter;
pub mod lexer;
pub mod macros;

use log::debug;

use crate::error::GerberError;

use self::interpreter::{ParseOptions, ParseOutput};

/// Parse the text of one RS-274X file into a board program.
///
/// Fatal errors abort the pass; everything else is reported in
/// [`ParseOutput::warnings`] with the affected geometry left out.
pub fn parse(text: &str, options: ParseOptions) -> Result<ParseOutput, GerberError> {
    let tokens = lexer::tokenize(text);
    debug!("Gerber: {} tokens", tokens.len());
    interpreter::interpret(&tokens, options)
}

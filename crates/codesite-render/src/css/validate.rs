use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::error::{RenderError, Result};

/// Checks that `css` tokenizes cleanly.
///
/// Runs the `cssparser` tokenizer over the whole input, descending into
/// every block, and rejects unmatched closing brackets, unterminated
/// strings and malformed `url()` tokens. Blocks left open at the end of the
/// input are accepted, as browsers close them implicitly.
///
/// ```
/// use codesite_render::css::validate;
///
/// assert!(validate(".a{color:red}").is_ok());
/// assert!(validate(".a{color:red}}").is_err());
/// ```
pub fn validate(css: &str) -> Result<()> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    check_tokens(&mut parser).map_err(|err| RenderError::InvalidCss {
        line: err.location.line + 1,
        column: err.location.column,
    })
}

fn check_tokens<'i, 't>(parser: &mut Parser<'i, 't>) -> std::result::Result<(), ParseError<'i, ()>> {
    loop {
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        match token {
            Token::CurlyBracketBlock
            | Token::SquareBracketBlock
            | Token::ParenthesisBlock
            | Token::Function(_) => {
                parser.parse_nested_block(check_tokens)?;
            }
            Token::CloseCurlyBracket
            | Token::CloseParenthesis
            | Token::CloseSquareBracket
            | Token::BadString(_)
            | Token::BadUrl(_) => {
                return Err(location.new_custom_error(()));
            }
            _ => {}
        }
    }
}

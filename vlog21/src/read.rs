//!
//! # Vlog Reading Module
//!
//! Facilities for reading the gate-level netlist subset from file or string.
//! Includes the core Lexer and Parser classes.
//!

// Standard Lib Imports
use std::io::Read;
use std::path::Path;
use std::str::Chars;

// Crates.io Imports
use log::{info, warn};
use serde::{Deserialize, Serialize};

// Local imports
use super::data::*;

/// Number of floating-net diagnostics reported individually
const MAX_FLOATING_REPORTS: usize = 10;

/// Parse netlist content from file `fname`
pub fn parse_file(fname: impl AsRef<Path>) -> VlogResult<VlogModule> {
    let mut file = std::fs::File::open(fname)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;
    parse_str(&src)
}
/// Parse netlist content `src` from string
pub fn parse_str(src: &str) -> VlogResult<VlogModule> {
    let mut parser = VlogParser::new(src)?;
    let module = parser.parse_module()?;
    Ok(module)
}

/// # Vlog Lexer / Tokenizer
///
/// Breaks input string `self.src` into an iteration of [Token]s,
/// consisting of source-locations and type-annotations.
///
pub struct VlogLexer<'src> {
    /// Source-string character iterator
    chars: Chars<'src>,
    /// Peekable next character
    next_char: Option<char>,
    /// Peekable next Token
    next_tok: Option<Token>,
    /// Current Position
    start: usize,
    /// Active character index
    pos: usize,
    /// Active line number
    line: usize,
    /// Character index at the beginning of the current line
    linestart: usize,
}
impl<'src> VlogLexer<'src> {
    pub(crate) fn new(src: &'src str) -> VlogResult<Self> {
        let mut chars = src.chars();
        let next_char = chars.next();
        let mut lex = Self {
            chars,
            next_char,
            next_tok: None,
            start: 0,
            pos: 0,
            line: 1,
            linestart: 0,
        };
        // Read the first token into our `next_tok` field
        lex.next_tok = lex._next_token()?;
        Ok(lex)
    }
    /// Get and return our next character, updating our position along the way
    fn next_char(&mut self) -> Option<char> {
        if self.next_char.is_none() {
            return None;
        }
        self.pos += 1;
        let mut rv = self.chars.next();
        std::mem::swap(&mut rv, &mut self.next_char);
        rv
    }
    /// Peek at our next character, without advancing
    fn peek_char(&self) -> &Option<char> {
        &self.next_char
    }
    /// Get an immutable reference to our next [Token], without advancing
    #[inline(always)]
    fn peek_token(&self) -> &Option<Token> {
        &self.next_tok
    }
    /// Get and return our next token, updating internal state along the way
    fn next_token(&mut self) -> VlogResult<Option<Token>> {
        if self.next_tok.is_none() {
            return Ok(None);
        }
        let mut tok = self._next_token()?;
        std::mem::swap(&mut tok, &mut self.next_tok);
        Ok(tok)
    }
    /// Internal implementation of `next_token`.
    /// Pulls our next [Token], removing ignored items such as commentary and whitespace.
    fn _next_token(&mut self) -> VlogResult<Option<Token>> {
        use TokenType::{Comment, NewLine, WhiteSpace};
        loop {
            match self.lex_one()? {
                None => return Ok(None),
                Some(t) => match t.ttype {
                    WhiteSpace | Comment | NewLine => continue, // Not emitted
                    _ => return Ok(Some(t)),
                },
            }
        }
    }
    /// Emit a [Token] of [TokenType] `ttype`.
    /// Uses the current Lexer location as its span, and updates the start-position upon creation.
    fn emit(&mut self, ttype: TokenType) -> Token {
        let loc = SourceLocation {
            start: self.start,
            stop: self.pos,
            line: self.line,
        };
        let tok = Token { loc, ttype };
        self.start = self.pos;
        tok
    }
    /// Accept a character if it meets predicate-function `f`
    fn accept(&mut self, f: impl Fn(char) -> bool) -> bool {
        match self.peek_char() {
            Some(ref ch) if f(*ch) => {
                self.next_char();
                true
            }
            _ => false,
        }
    }
    /// Accept a single-character match
    fn accept_char(&mut self, c: char) -> bool {
        self.accept(|a| a == c)
    }
    /// Lex the next [Token]
    fn lex_one(&mut self) -> VlogResult<Option<Token>> {
        if self.peek_char().is_none() {
            return Ok(None); // End of input
        }
        if self.accept_char('\n') {
            return self.lex_newline();
        }
        if self.accept(char::is_whitespace) {
            return self.lex_whitespace();
        }
        if self.accept_char(';') {
            return Ok(Some(self.emit(TokenType::SemiColon)));
        }
        if self.accept_char(',') {
            return Ok(Some(self.emit(TokenType::Comma)));
        }
        if self.accept_char('.') {
            return Ok(Some(self.emit(TokenType::Dot)));
        }
        if self.accept_char('(') {
            return Ok(Some(self.emit(TokenType::LParen)));
        }
        if self.accept_char(')') {
            return Ok(Some(self.emit(TokenType::RParen)));
        }
        if self.accept_char('/') {
            return self.lex_comment();
        }
        if self.accept(|c| c.is_ascii_digit()) {
            return self.lex_number();
        }
        if self.accept_char('\\') {
            return self.lex_escaped_name();
        }
        if self.accept(|c| c.is_alphabetic() || c == '_') {
            return self.lex_name();
        }
        self.fail() // Some other, invalid character. Fail.
    }
    /// Lex newlines, incrementing our line-number
    fn lex_newline(&mut self) -> VlogResult<Option<Token>> {
        let tok = self.emit(TokenType::NewLine);
        self.line += 1;
        self.linestart = self.pos;
        Ok(Some(tok))
    }
    /// Lex whitespace
    fn lex_whitespace(&mut self) -> VlogResult<Option<Token>> {
        while self.accept(|c| c.is_ascii_whitespace() && c != '\n') {
            continue;
        }
        let tok = self.emit(TokenType::WhiteSpace);
        Ok(Some(tok))
    }
    /// Lex a number
    fn lex_number(&mut self) -> VlogResult<Option<Token>> {
        while self.accept(|c| c.is_ascii_digit() || c == '.') {
            continue;
        }
        let tok = self.emit(TokenType::Number);
        Ok(Some(tok))
    }
    /// Lex a line-comment. Verilog's `/* */` form is not supported.
    fn lex_comment(&mut self) -> VlogResult<Option<Token>> {
        // First slash has been read. Fail unless we get the second.
        if !self.accept_char('/') {
            return self.fail();
        }
        while self.accept(|c| c != '\n') {
            continue;
        }
        let tok = self.emit(TokenType::Comment);
        Ok(Some(tok))
    }
    /// Lex a name. Names run to the next whitespace or separator character.
    fn lex_name(&mut self) -> VlogResult<Option<Token>> {
        while self.accept(|c| !c.is_whitespace() && !is_separator(c)) {
            continue;
        }
        Ok(Some(self.emit(TokenType::Name)))
    }
    /// Lex a back-slash escaped name, which runs to the next whitespace,
    /// separators included.
    fn lex_escaped_name(&mut self) -> VlogResult<Option<Token>> {
        while self.accept(|c| !c.is_whitespace()) {
            continue;
        }
        Ok(Some(self.emit(TokenType::Name)))
    }
    /// Error-Generation Helper
    /// Collect our current position and content into a [VlogError::Lex]
    fn fail<T>(&self) -> VlogResult<T> {
        Err(VlogError::Lex {
            next_char: *self.peek_char(),
            line: self.line,
            pos: self.pos,
        })
    }
}
/// Boolean indication of whether `c` separates netlist tokens
fn is_separator(c: char) -> bool {
    matches!(c, '.' | ',' | '(' | ')' | ';')
}
/// Iterator protocol for [VlogLexer], often handy for testing.
/// Panics on Lexer errors.
impl<'s> Iterator for VlogLexer<'s> {
    type Item = Token;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().unwrap()
    }
}
/// Location of a [Token] in the source string
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Start character index (inclusive)
    start: usize,
    /// End character index (exclusive)
    stop: usize,
    /// Line number
    line: usize,
}
/// Lexer Token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Source Location
    loc: SourceLocation,
    /// Token Type
    ttype: TokenType,
}
impl Token {
    /// Return a sub-string of input-string `src` over our locations
    pub(crate) fn substr<'me, 'src>(&'me self, src: &'src str) -> &'src str {
        &src[self.loc.start..self.loc.stop]
    }
}
/// Token Types Enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Name,
    Number,
    Dot,
    Comma,
    LParen,
    RParen,
    SemiColon,
    NewLine,
    WhiteSpace,
    Comment,
}
/// Enumerated parsing contexts, largely for capturing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VlogParseContext {
    Module,
    PortDeclaration,
    WireDeclaration,
    Instance,
    Unknown,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VlogParseErrorType {
    /// Netlist is not gate-level (register or behavioral content)
    NotGateLevel,
    /// Degenerate netlist: a required section is empty
    Degenerate { missing: String },
    /// Invalid Token
    InvalidToken { expected: TokenType },
    /// Syntax Error: missing keyword or identifier at a required location
    RequiredWord { expected: String },
    /// All other errors
    Other,
}
/// Vlog Parser
/// Transforms input string of lifetime 'src into a [VlogModule]
pub struct VlogParser<'src> {
    /// Source string
    src: &'src str,
    /// Lexer
    lex: VlogLexer<'src>,
    /// Context Stack
    ctx: Vec<VlogParseContext>,
}
impl<'src> VlogParser<'src> {
    /// Construct a [VlogParser] of input-text `src`
    pub(crate) fn new(src: &'src str) -> VlogResult<Self> {
        let lex = VlogLexer::new(src)?;
        Ok(Self {
            src,
            lex,
            ctx: Vec::new(),
        })
    }
    /// Advance the lexer and get its next token
    #[inline(always)]
    fn next_token(&mut self) -> VlogResult<Option<Token>> {
        self.lex.next_token()
    }
    /// Advance by a [Token] without returning it
    #[inline(always)]
    fn advance(&mut self) -> VlogResult<()> {
        let _ = self.lex.next_token()?;
        Ok(())
    }
    #[inline(always)]
    fn peek_token(&self) -> &Option<Token> {
        self.lex.peek_token()
    }
    /// Boolean indication of whether our next Token is of [TokenType] `ttype`
    fn matches(&self, ttype: TokenType) -> bool {
        matches!(self.peek_token(), Some(t) if t.ttype == ttype)
    }
    /// Assert the expectation that the next [Token] is of [TokenType] `ttype`.
    /// Returns the [Token] if so. Returns an [Err] if not.
    fn expect(&mut self, ttype: TokenType) -> VlogResult<Token> {
        match self.next_token()? {
            Some(t) if t.ttype == ttype => Ok(t),
            _ => self.fail(VlogParseErrorType::InvalidToken { expected: ttype }),
        }
    }
    /// Assert the next [Token] is a [TokenType::Name], and return its string value
    #[inline(always)]
    fn get_name(&mut self) -> VlogResult<&str> {
        let tok = self.expect(TokenType::Name)?;
        Ok(self.txt(&tok))
    }
    /// Parse an identifier into an owned [String]
    fn parse_ident(&mut self) -> VlogResult<String> {
        let txt = self.get_name()?;
        Ok(String::from(txt))
    }
    /// Peek at the text of the next token, or empty-string at end-of-input
    fn peek_txt(&self) -> &str {
        match self.peek_token() {
            Some(t) => t.substr(self.src),
            None => "",
        }
    }
    /// Retrieve the text-content of lexer [Token] `tok`
    #[inline(always)]
    fn txt(&self, tok: &Token) -> &str {
        tok.substr(self.src)
    }
    /// Parse a [VlogModule]
    pub(crate) fn parse_module(&mut self) -> VlogResult<VlogModule> {
        self.ctx.push(VlogParseContext::Module);
        let mut module = VlogModule::default();

        // Module header: `module <name> ( <ports> ) ;`
        self.expect_keyword("module")?;
        module.name = self.parse_ident()?;
        // The header port list repeats the declarations below; skip it.
        loop {
            match self.next_token()? {
                Some(t) if t.ttype == TokenType::SemiColon => break,
                Some(_) => continue,
                None => {
                    return self.fail(VlogParseErrorType::InvalidToken {
                        expected: TokenType::SemiColon,
                    })
                }
            }
        }

        // Declarations and instantiations, one statement at a time
        loop {
            match self.peek_token() {
                None => break, // End of input; tolerated like a missing `endmodule`
                Some(t) if t.ttype == TokenType::Name => (),
                Some(_) => {
                    return self.fail(VlogParseErrorType::InvalidToken {
                        expected: TokenType::Name,
                    })
                }
            }
            match self.peek_txt() {
                "endmodule" => {
                    self.advance()?;
                    break;
                }
                "input" => {
                    self.ctx.push(VlogParseContext::PortDeclaration);
                    self.advance()?;
                    for name in self.parse_name_list()? {
                        module.ports.push(VlogPort {
                            name,
                            direction: PortDirection::Input,
                        });
                    }
                    self.ctx.pop();
                }
                "output" => {
                    self.ctx.push(VlogParseContext::PortDeclaration);
                    self.advance()?;
                    for name in self.parse_name_list()? {
                        module.ports.push(VlogPort {
                            name,
                            direction: PortDirection::Output,
                        });
                    }
                    self.ctx.pop();
                }
                "wire" => {
                    self.ctx.push(VlogParseContext::WireDeclaration);
                    self.advance()?;
                    let mut names = self.parse_name_list()?;
                    module.wires.append(&mut names);
                    self.ctx.pop();
                }
                "reg" | "always" | "assign" | "initial" => {
                    return self.fail(VlogParseErrorType::NotGateLevel);
                }
                _ => {
                    let inst = self.parse_instance()?;
                    module.instances.push(inst);
                }
            }
        }

        // A net is either a port or an internal wire, never both
        let port_names: std::collections::HashSet<&str> =
            module.ports.iter().map(|p| p.name.as_str()).collect();
        module.wires.retain(|w| !port_names.contains(w.as_str()));

        // Reject degenerate netlists
        if module.inputs().count() == 0 {
            return self.degenerate("inputs");
        }
        if module.outputs().count() == 0 {
            return self.degenerate("outputs");
        }
        if module.wires.is_empty() {
            return self.degenerate("wires");
        }
        if module.instances.is_empty() {
            return self.degenerate("instances");
        }

        // Close the graph at the module boundary, then build it
        module.create_shadow_instances();
        module.build_graph()?;

        // Floating-net diagnostics; counted and reported, never fatal
        let floats = module.floating_nets();
        for fl in floats.iter().take(MAX_FLOATING_REPORTS) {
            warn!(
                "floating net {} at {} {} pin {}",
                fl.net, fl.instance, fl.gate_type, fl.pin
            );
        }
        info!("num floating nets: {}", floats.len());

        self.ctx.pop();
        Ok(module)
    }
    /// Parse a comma-separated list of names, consuming the trailing semicolon.
    /// Handles declarations continued over multiple source lines.
    fn parse_name_list(&mut self) -> VlogResult<Vec<String>> {
        let mut names = Vec::new();
        loop {
            names.push(self.parse_ident()?);
            if self.matches(TokenType::Comma) {
                self.advance()?;
                continue;
            }
            self.expect(TokenType::SemiColon)?;
            break;
        }
        Ok(names)
    }
    /// Parse one gate instantiation:
    /// `<gate_type> <name> ( .<pin>(<net>), ... ) ;`
    fn parse_instance(&mut self) -> VlogResult<VlogInstance> {
        self.ctx.push(VlogParseContext::Instance);
        let gate_type = self.parse_ident()?;
        let name = self.parse_ident()?;
        let mut inst = VlogInstance::new(gate_type, name);
        self.expect(TokenType::LParen)?;
        loop {
            if self.matches(TokenType::RParen) {
                self.advance()?;
                break;
            }
            self.expect(TokenType::Dot)?;
            let pin = self.parse_ident()?;
            self.expect(TokenType::LParen)?;
            let net = self.parse_ident()?;
            self.expect(TokenType::RParen)?;
            if self.matches(TokenType::Comma) {
                self.advance()?;
            }
            inst.connect(pin, net);
        }
        self.expect(TokenType::SemiColon)?;
        self.ctx.pop();
        Ok(inst)
    }
    /// Assert that the next [Token] is a [TokenType::Name] matching `word` literally
    fn expect_keyword(&mut self, word: &str) -> VlogResult<()> {
        let txt = self.get_name()?;
        if txt == word {
            Ok(())
        } else {
            self.fail(VlogParseErrorType::RequiredWord {
                expected: String::from(word),
            })
        }
    }
    /// Error-Generation Helper for degenerate netlists
    fn degenerate<T>(&self, missing: &str) -> VlogResult<T> {
        self.fail(VlogParseErrorType::Degenerate {
            missing: missing.to_string(),
        })
    }
    /// Error-Generation Helper
    fn fail<T>(&self, tp: VlogParseErrorType) -> VlogResult<T> {
        Err(VlogError::Parse {
            tp,
            msg: None,
            state: self.state(),
        })
    }
    /// Extract the state of the parser. Generally for error reporting.
    fn state(&self) -> ParserState {
        let token = match self.lex.next_tok {
            Some(t) => self.txt(&t),
            None => "EOF",
        }
        .to_string();
        // Sort out the content on our current line, by finding the next newline
        const MAX_CHARS_IN_LINE: usize = 200;
        let mut chars = self.lex.chars.clone();
        let mut line_end = self.lex.linestart;
        for _ in 0..MAX_CHARS_IN_LINE {
            match chars.next() {
                None => break,
                Some(c) if c == '\n' => break,
                Some(_) => line_end += 1,
            }
        }
        let line_content = self.src[self.lex.linestart..line_end].to_string();
        ParserState {
            ctx: self.ctx.clone(),
            line_content,
            line_num: self.lex.line,
            token,
            pos: self.lex.pos,
        }
    }
}
/// State of the parser, generally exposed when providing error info
#[allow(dead_code)]
#[derive(Debug)]
pub struct ParserState {
    ctx: Vec<VlogParseContext>,
    token: String,
    line_content: String,
    line_num: usize,
    pos: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_lexes() -> VlogResult<()> {
        let src = "nand02 u1 ( .a(n1), .o(n2) ); // commentary \n";
        let lex = VlogLexer::new(src)?;
        let toks_vec: Vec<Token> = lex.collect();
        let tok_strs: Vec<&str> = toks_vec.iter().map(|t| t.substr(src)).collect();
        assert_eq!(
            tok_strs,
            vec!["nand02", "u1", "(", ".", "a", "(", "n1", ")", ",", ".", "o", "(", "n2", ")", ")", ";"]
        );
        Ok(())
    }
    #[test]
    fn it_lexes_escaped_names() -> VlogResult<()> {
        let src = r"\inst[3] ";
        let lex = VlogLexer::new(src)?;
        let toks_vec: Vec<Token> = lex.collect();
        assert_eq!(toks_vec.len(), 1);
        assert_eq!(toks_vec[0].substr(src), r"\inst[3]");
        Ok(())
    }
    #[test]
    fn it_rejects_registers() {
        let src = r#"
            module bad (a, y);
            input a;
            output y;
            reg q;
            endmodule
        "#;
        let err = parse_str(src);
        assert!(matches!(
            err,
            Err(VlogError::Parse {
                tp: VlogParseErrorType::NotGateLevel,
                ..
            })
        ));
    }
}

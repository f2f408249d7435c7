//!
//! # Def Reading Module
//!
//! Facilities for reading the DEF layout subset from file or string.
//! The sections the flow consumes (`UNITS`, `ROW`, `COMPONENTS`, `PINS`)
//! are parsed into the data model; `TRACKS` and `GCELLGRID` are
//! recognized and ignored; routing sections are skipped whole.
//!

// Standard Lib Imports
use std::io::Read;
use std::path::Path;
use std::str::Chars;
#[allow(unused_imports)]
use std::str::FromStr;

// Crates.io Imports
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

// Local imports
use super::data::*;

/// Parse DEF content from file `fname`
pub fn parse_file(fname: impl AsRef<Path>) -> DefResult<DefDesign> {
    let mut file = std::fs::File::open(fname)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;
    parse_str(&src)
}
/// Parse DEF content `src` from string
pub fn parse_str(src: &str) -> DefResult<DefDesign> {
    let mut parser = DefParser::new(src)?;
    let design = parser.parse_design()?;
    Ok(design)
}

/// # Def Lexer / Tokenizer
pub struct DefLexer<'src> {
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
impl<'src> DefLexer<'src> {
    pub(crate) fn new(src: &'src str) -> DefResult<Self> {
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
    fn next_token(&mut self) -> DefResult<Option<Token>> {
        if self.next_tok.is_none() {
            return Ok(None);
        }
        let mut tok = self._next_token()?;
        std::mem::swap(&mut tok, &mut self.next_tok);
        Ok(tok)
    }
    /// Internal implementation of `next_token`.
    /// Pulls our next [Token], removing commentary, whitespace, and newlines.
    fn _next_token(&mut self) -> DefResult<Option<Token>> {
        use TokenType::{Comment, NewLine, WhiteSpace};
        loop {
            match self.lex_one()? {
                None => return Ok(None),
                Some(t) => match t.ttype {
                    WhiteSpace | Comment | NewLine => continue,
                    _ => return Ok(Some(t)),
                },
            }
        }
    }
    /// Emit a [Token] of [TokenType] `ttype`
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
    fn lex_one(&mut self) -> DefResult<Option<Token>> {
        if self.peek_char().is_none() {
            return Ok(None);
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
        if self.accept_char('+') {
            return Ok(Some(self.emit(TokenType::Plus)));
        }
        if self.accept_char('(') {
            return Ok(Some(self.emit(TokenType::LParen)));
        }
        if self.accept_char(')') {
            return Ok(Some(self.emit(TokenType::RParen)));
        }
        if self.accept_char('"') {
            return self.lex_string_literal();
        }
        if self.accept_char('#') {
            return self.lex_comment();
        }
        if self.accept_char('-') {
            // A record marker, unless a number follows directly
            if matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                return self.lex_number();
            }
            return Ok(Some(self.emit(TokenType::Dash)));
        }
        if self.accept(|c| c.is_ascii_digit()) {
            return self.lex_number();
        }
        if self.accept(|c| c.is_alphabetic() || c == '_') {
            return self.lex_name();
        }
        self.fail()
    }
    /// Lex newlines, incrementing our line-number
    fn lex_newline(&mut self) -> DefResult<Option<Token>> {
        let tok = self.emit(TokenType::NewLine);
        self.line += 1;
        self.linestart = self.pos;
        Ok(Some(tok))
    }
    /// Lex whitespace
    fn lex_whitespace(&mut self) -> DefResult<Option<Token>> {
        while self.accept(|c| c.is_ascii_whitespace() && c != '\n') {
            continue;
        }
        Ok(Some(self.emit(TokenType::WhiteSpace)))
    }
    /// Lex a number
    fn lex_number(&mut self) -> DefResult<Option<Token>> {
        while self.accept(|c| c.is_ascii_digit() || c == '.') {
            continue;
        }
        Ok(Some(self.emit(TokenType::Number)))
    }
    /// Lex a string literal
    fn lex_string_literal(&mut self) -> DefResult<Option<Token>> {
        while self.accept(|c| c != '"') {
            continue;
        }
        self.next_char(); // Bump over the closing quote
        Ok(Some(self.emit(TokenType::StringLiteral)))
    }
    /// Lex a comment
    fn lex_comment(&mut self) -> DefResult<Option<Token>> {
        while self.accept(|c| c != '\n') {
            continue;
        }
        Ok(Some(self.emit(TokenType::Comment)))
    }
    /// Lex a String Name
    fn lex_name(&mut self) -> DefResult<Option<Token>> {
        while self.accept(|c| !c.is_whitespace() && !matches!(c, ';' | '(' | ')')) {
            continue;
        }
        Ok(Some(self.emit(TokenType::Name)))
    }
    /// Error-Generation Helper
    fn fail<T>(&self) -> DefResult<T> {
        Err(DefError::Lex {
            next_char: *self.peek_char(),
            line: self.line,
            pos: self.pos,
        })
    }
}
/// Iterator protocol for [DefLexer], handy for testing.
/// Panics on Lexer errors.
impl<'s> Iterator for DefLexer<'s> {
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
    loc: SourceLocation,
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
    Dash,
    Plus,
    LParen,
    RParen,
    SemiColon,
    StringLiteral,
    NewLine,
    WhiteSpace,
    Comment,
}
/// Enumerated parsing contexts, largely for capturing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefParseContext {
    Design,
    Units,
    Row,
    Components,
    Pins,
    Unknown,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefParseErrorType {
    /// A section's declared record count differs from its actual count
    CountMismatch {
        section: String,
        declared: usize,
        actual: usize,
    },
    /// Invalid Value
    InvalidValue,
    /// Invalid Token
    InvalidToken { expected: TokenType },
    /// Syntax Error: missing keyword or identifier at a required location
    RequiredWord { expected: String },
    /// All other errors
    Other,
}

/// Def Parser
/// Transforms input string of lifetime 'src into a [DefDesign]
pub struct DefParser<'src> {
    /// Source string
    src: &'src str,
    /// Lexer
    lex: DefLexer<'src>,
    /// Context Stack
    ctx: Vec<DefParseContext>,
}
impl<'src> DefParser<'src> {
    /// Construct a [DefParser] of input-text `src`
    pub(crate) fn new(src: &'src str) -> DefResult<Self> {
        let lex = DefLexer::new(src)?;
        Ok(Self {
            src,
            lex,
            ctx: Vec::new(),
        })
    }
    /// Advance the lexer and get its next token
    #[inline(always)]
    fn next_token(&mut self) -> DefResult<Option<Token>> {
        self.lex.next_token()
    }
    /// Advance by a [Token] without returning it
    #[inline(always)]
    fn advance(&mut self) -> DefResult<()> {
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
    /// Peek at the text of the next token, or empty-string at end-of-input
    fn peek_txt(&self) -> &str {
        match self.peek_token() {
            Some(t) => t.substr(self.src),
            None => "",
        }
    }
    /// Assert the expectation that the next [Token] is of [TokenType] `ttype`.
    /// Returns the [Token] if so. Returns an [Err] if not.
    fn expect(&mut self, ttype: TokenType) -> DefResult<Token> {
        match self.next_token()? {
            Some(t) if t.ttype == ttype => Ok(t),
            _ => self.fail(DefParseErrorType::InvalidToken { expected: ttype }),
        }
    }
    /// Assert the next [Token] is a [TokenType::Name], and return its string value
    #[inline(always)]
    fn get_name(&mut self) -> DefResult<&str> {
        let tok = self.expect(TokenType::Name)?;
        Ok(self.txt(&tok))
    }
    /// Parse an identifier into an owned [String]
    fn parse_ident(&mut self) -> DefResult<String> {
        let txt = self.get_name()?;
        Ok(String::from(txt))
    }
    /// Assert that the next [Token] is a [TokenType::Name] matching `word` literally
    fn expect_word(&mut self, word: &str) -> DefResult<()> {
        let txt = self.get_name()?;
        if txt == word {
            Ok(())
        } else {
            self.fail(DefParseErrorType::RequiredWord {
                expected: String::from(word),
            })
        }
    }
    /// Parse the next token into a [DefDecimal] number
    fn parse_number(&mut self) -> DefResult<DefDecimal> {
        let tok = self.expect(TokenType::Number)?;
        let txt = self.txt(&tok);
        Ok(DefDecimal::from_str(txt)?)
    }
    /// Parse a parenthesized `( x y )` point
    fn parse_point(&mut self) -> DefResult<DefPoint> {
        self.expect(TokenType::LParen)?;
        let x = self.parse_number()?;
        let y = self.parse_number()?;
        self.expect(TokenType::RParen)?;
        Ok(DefPoint { x, y })
    }
    /// Parse a [DefOrient]
    fn parse_orient(&mut self) -> DefResult<DefOrient> {
        let txt = self.get_name()?;
        match DefOrient::parse(txt) {
            Some(o) => Ok(o),
            None => self.fail(DefParseErrorType::InvalidValue),
        }
    }
    /// Retrieve the text-content of lexer [Token] `tok`
    #[inline(always)]
    fn txt(&self, tok: &Token) -> &str {
        tok.substr(self.src)
    }
    /// Skip the remainder of a statement, consuming through its semicolon
    fn skip_statement(&mut self) -> DefResult<()> {
        loop {
            match self.next_token()? {
                Some(t) if t.ttype == TokenType::SemiColon => return Ok(()),
                Some(_) => continue,
                None => {
                    return self.fail(DefParseErrorType::InvalidToken {
                        expected: TokenType::SemiColon,
                    })
                }
            }
        }
    }
    /// Skip a whole section, consuming through its `END <close>` delimiter
    fn skip_section(&mut self, close: &str) -> DefResult<()> {
        loop {
            match self.next_token()? {
                Some(t) if t.ttype == TokenType::Name && self.txt(&t) == "END" => {
                    match *self.peek_token() {
                        Some(n) if n.ttype == TokenType::Name && n.substr(self.src) == close => {
                            self.advance()?;
                            return Ok(());
                        }
                        _ => continue,
                    }
                }
                Some(_) => continue,
                None => {
                    return self.fail(DefParseErrorType::RequiredWord {
                        expected: format!("END {}", close),
                    })
                }
            }
        }
    }
    /// Parse a [DefDesign]
    fn parse_design(&mut self) -> DefResult<DefDesign> {
        self.ctx.push(DefParseContext::Design);
        let mut design = DefDesign::default();
        loop {
            if self.peek_token().is_none() {
                break; // End of input is a valid design end
            }
            if self.matches(TokenType::Dash) {
                // A stray record outside any parsed section
                self.skip_statement()?;
                continue;
            }
            match self.peek_txt() {
                "VERSION" => {
                    self.advance()?;
                    design.version = Some(self.parse_number()?);
                    self.expect(TokenType::SemiColon)?;
                }
                "DIVIDERCHAR" => {
                    self.advance()?;
                    let tok = self.expect(TokenType::StringLiteral)?;
                    let chars: Vec<char> = self.txt(&tok).chars().collect();
                    if chars.len() != 3 {
                        return self.fail(DefParseErrorType::InvalidValue);
                    }
                    design.divider_char = Some(chars[1]);
                    self.expect(TokenType::SemiColon)?;
                }
                "BUSBITCHARS" => {
                    self.advance()?;
                    let tok = self.expect(TokenType::StringLiteral)?;
                    let chars: Vec<char> = self.txt(&tok).chars().collect();
                    if chars.len() != 4 {
                        return self.fail(DefParseErrorType::InvalidValue);
                    }
                    design.bus_bit_chars = Some((chars[1], chars[2]));
                    self.expect(TokenType::SemiColon)?;
                }
                "DESIGN" => {
                    self.advance()?;
                    design.name = self.parse_ident()?;
                    self.expect(TokenType::SemiColon)?;
                }
                "UNITS" => {
                    self.ctx.push(DefParseContext::Units);
                    self.advance()?;
                    self.expect_word("DISTANCE")?;
                    self.expect_word("MICRONS")?;
                    let num = self.parse_number()?;
                    self.expect(TokenType::SemiColon)?;
                    design.dbu_per_micron = match num.to_u32() {
                        Some(v) if num.fract().is_zero() => v,
                        _ => return self.fail(DefParseErrorType::InvalidValue),
                    };
                    self.ctx.pop();
                }
                "DIEAREA" => {
                    self.advance()?;
                    let ll = self.parse_point()?;
                    let ur = self.parse_point()?;
                    // Rectilinear die outlines list further points; the
                    // first two corners are all the flow consumes
                    while self.matches(TokenType::LParen) {
                        self.parse_point()?;
                    }
                    self.expect(TokenType::SemiColon)?;
                    design.die_area = Some((ll, ur));
                }
                "ROW" => {
                    let row = self.parse_row()?;
                    design.rows.push(row);
                }
                "TRACKS" | "GCELLGRID" | "HISTORY" => {
                    // Recognized and ignored
                    self.advance()?;
                    self.skip_statement()?;
                }
                "PROPERTYDEFINITIONS" => {
                    self.advance()?;
                    self.skip_section("PROPERTYDEFINITIONS")?;
                }
                "VIAS" | "NETS" | "SPECIALNETS" | "REGIONS" | "GROUPS" | "BLOCKAGES"
                | "FILLS" => {
                    let close = self.parse_ident()?;
                    self.skip_statement()?; // The `<n> ;` section header
                    self.skip_section(&close)?;
                }
                "COMPONENTS" => {
                    self.advance()?;
                    design.components = self.parse_components()?;
                }
                "PINS" => {
                    self.advance()?;
                    design.pins = self.parse_pins()?;
                }
                "END" => {
                    self.advance()?;
                    self.expect_word("DESIGN")?;
                    break;
                }
                _ => {
                    if !self.matches(TokenType::Name) {
                        return self.fail(DefParseErrorType::InvalidToken {
                            expected: TokenType::Name,
                        });
                    }
                    self.skip_statement()?;
                }
            }
        }
        self.ctx.pop();
        Ok(design)
    }
    /// Parse one `ROW` statement
    fn parse_row(&mut self) -> DefResult<DefRow> {
        self.ctx.push(DefParseContext::Row);
        self.expect_word("ROW")?;
        let name = self.parse_ident()?;
        let site = self.parse_ident()?;
        let x = self.parse_number()?;
        let y = self.parse_number()?;
        let orient = self.parse_orient()?;
        self.expect_word("DO")?;
        let num_x = self.parse_count()?;
        self.expect_word("BY")?;
        let num_y = self.parse_count()?;
        self.expect_word("STEP")?;
        let dx = self.parse_number()?;
        let dy = self.parse_number()?;
        self.expect(TokenType::SemiColon)?;
        self.ctx.pop();
        Ok(DefRow {
            name,
            site,
            origin: DefPoint { x, y },
            orient,
            num_x,
            num_y,
            step: DefPoint { x: dx, y: dy },
        })
    }
    /// Parse the `COMPONENTS` section
    fn parse_components(&mut self) -> DefResult<Vec<DefComponent>> {
        self.ctx.push(DefParseContext::Components);
        let declared = self.parse_count()? as usize;
        self.expect(TokenType::SemiColon)?;
        let mut components = Vec::new();
        loop {
            if self.matches(TokenType::Dash) {
                self.advance()?;
                components.push(self.parse_component_record()?);
                continue;
            }
            self.expect_word("END")?;
            self.expect_word("COMPONENTS")?;
            break;
        }
        if components.len() != declared {
            return self.fail(DefParseErrorType::CountMismatch {
                section: "COMPONENTS".to_string(),
                declared,
                actual: components.len(),
            });
        }
        self.ctx.pop();
        Ok(components)
    }
    /// Parse one component record:
    /// `- <name> <macro> + PLACED|FIXED ( x y ) <orient> ;`
    fn parse_component_record(&mut self) -> DefResult<DefComponent> {
        let mut comp = DefComponent {
            name: self.parse_ident()?,
            macro_name: self.parse_ident()?,
            ..Default::default()
        };
        loop {
            if self.matches(TokenType::SemiColon) {
                self.advance()?;
                break;
            }
            self.expect(TokenType::Plus)?;
            let key = self.parse_ident()?;
            match key.as_str() {
                "PLACED" | "FIXED" | "COVER" => {
                    comp.fixed = key != "PLACED";
                    comp.location = self.parse_point()?;
                    comp.orient = self.parse_orient()?;
                }
                "UNPLACED" => (),
                // SOURCE, WEIGHT, and other attributes
                _ => self.skip_attribute()?,
            }
        }
        Ok(comp)
    }
    /// Parse the `PINS` section
    fn parse_pins(&mut self) -> DefResult<Vec<DefPin>> {
        self.ctx.push(DefParseContext::Pins);
        let declared = self.parse_count()? as usize;
        self.expect(TokenType::SemiColon)?;
        let mut pins = Vec::new();
        loop {
            if self.matches(TokenType::Dash) {
                self.advance()?;
                pins.push(self.parse_pin_record()?);
                continue;
            }
            self.expect_word("END")?;
            self.expect_word("PINS")?;
            break;
        }
        if pins.len() != declared {
            return self.fail(DefParseErrorType::CountMismatch {
                section: "PINS".to_string(),
                declared,
                actual: pins.len(),
            });
        }
        self.ctx.pop();
        Ok(pins)
    }
    /// Parse one pin record:
    /// `- <name> + NET <net> + DIRECTION <dir> + FIXED ( x y ) <orient>
    ///  + LAYER <layer> ( x y ) ( x y ) ;`
    fn parse_pin_record(&mut self) -> DefResult<DefPin> {
        let mut pin = DefPin {
            name: self.parse_ident()?,
            ..Default::default()
        };
        loop {
            if self.matches(TokenType::SemiColon) {
                self.advance()?;
                break;
            }
            self.expect(TokenType::Plus)?;
            let key = self.parse_ident()?;
            match key.as_str() {
                "NET" => pin.net = self.parse_ident()?,
                "DIRECTION" => pin.direction = self.parse_ident()?,
                "PLACED" | "FIXED" => {
                    pin.fixed = key == "FIXED";
                    pin.location = self.parse_point()?;
                    pin.orient = self.parse_orient()?;
                }
                "LAYER" => {
                    let layer_name = self.parse_ident()?;
                    let ll = self.parse_point()?;
                    let ur = self.parse_point()?;
                    pin.layer = Some(DefPinLayer { layer_name, ll, ur });
                }
                // USE, SPECIAL, and other attributes
                _ => self.skip_attribute()?,
            }
        }
        Ok(pin)
    }
    /// Skip an unrecognized `+ KEY ...` attribute group, stopping ahead of
    /// the next `+`, or of the record-closing semicolon
    fn skip_attribute(&mut self) -> DefResult<()> {
        loop {
            match self.peek_token() {
                Some(t) if t.ttype == TokenType::Plus || t.ttype == TokenType::SemiColon => {
                    return Ok(())
                }
                Some(_) => self.advance()?,
                None => {
                    return self.fail(DefParseErrorType::InvalidToken {
                        expected: TokenType::SemiColon,
                    })
                }
            }
        }
    }
    /// Parse an integer repetition/record count
    fn parse_count(&mut self) -> DefResult<isize> {
        let num = self.parse_number()?;
        match num.to_i64() {
            Some(v) if num.fract().is_zero() => Ok(v as isize),
            _ => self.fail(DefParseErrorType::InvalidValue),
        }
    }
    /// Error-Generation Helper
    fn fail<T>(&self, tp: DefParseErrorType) -> DefResult<T> {
        Err(DefError::Parse {
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
    ctx: Vec<DefParseContext>,
    token: String,
    line_content: String,
    line_num: usize,
    pos: usize,
}

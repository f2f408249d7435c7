//!
//! # TechLef Reading Module
//!
//! Facilities for reading the LEF library subset from file or string.
//! Includes the core Lexer and Parser classes.
//!
//! The grammar covered here is the contest-restricted one: statements the
//! flow consumes are parsed into the data model, everything else inside a
//! recognized block is skipped statement-wise, and unsupported top-level
//! blocks (`VIA`, `PROPERTYDEFINITIONS`, `SPACING`) are skipped whole.
//!

// Standard Lib Imports
use std::io::Read;
use std::path::Path;
use std::str::Chars;
#[allow(unused_imports)]
use std::str::FromStr;

// Crates.io Imports
use serde::{Deserialize, Serialize};

// Local imports
use super::data::*;

/// Parse LEF content from file `fname`
pub fn parse_file(fname: impl AsRef<Path>) -> TechLefResult<TechLefLibrary> {
    let mut file = std::fs::File::open(fname)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;
    parse_str(&src)
}
/// Parse LEF content `src` from string
pub fn parse_str(src: &str) -> TechLefResult<TechLefLibrary> {
    let mut parser = TechLefParser::new(src)?;
    let lib = parser.parse_lib()?;
    Ok(lib)
}

/// # TechLef Lexer / Tokenizer
pub struct TechLefLexer<'src> {
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
impl<'src> TechLefLexer<'src> {
    pub(crate) fn new(src: &'src str) -> TechLefResult<Self> {
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
    fn next_token(&mut self) -> TechLefResult<Option<Token>> {
        if self.next_tok.is_none() {
            return Ok(None);
        }
        let mut tok = self._next_token()?;
        std::mem::swap(&mut tok, &mut self.next_tok);
        Ok(tok)
    }
    /// Internal implementation of `next_token`.
    /// Pulls our next [Token], removing commentary, whitespace, and newlines.
    fn _next_token(&mut self) -> TechLefResult<Option<Token>> {
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
    fn lex_one(&mut self) -> TechLefResult<Option<Token>> {
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
        if self.accept_char('"') {
            return self.lex_string_literal();
        }
        if self.accept_char('#') {
            return self.lex_comment();
        }
        if self.accept(|c| c.is_ascii_digit() || c == '-') {
            return self.lex_number();
        }
        if self.accept(char::is_alphabetic) {
            return self.lex_name();
        }
        self.fail()
    }
    /// Lex newlines, incrementing our line-number
    fn lex_newline(&mut self) -> TechLefResult<Option<Token>> {
        let tok = self.emit(TokenType::NewLine);
        self.line += 1;
        self.linestart = self.pos;
        Ok(Some(tok))
    }
    /// Lex whitespace
    fn lex_whitespace(&mut self) -> TechLefResult<Option<Token>> {
        while self.accept(|c| c.is_ascii_whitespace() && c != '\n') {
            continue;
        }
        Ok(Some(self.emit(TokenType::WhiteSpace)))
    }
    /// Lex a number
    fn lex_number(&mut self) -> TechLefResult<Option<Token>> {
        while self.accept(|c| c.is_ascii_digit() || c == '.') {
            continue;
        }
        Ok(Some(self.emit(TokenType::Number)))
    }
    /// Lex a string literal
    fn lex_string_literal(&mut self) -> TechLefResult<Option<Token>> {
        // First double-quote has been read; accept everything to the closer
        while self.accept(|c| c != '"') {
            continue;
        }
        self.next_char(); // And bump over the closing quote
        Ok(Some(self.emit(TokenType::StringLiteral)))
    }
    /// Lex a comment
    fn lex_comment(&mut self) -> TechLefResult<Option<Token>> {
        while self.accept(|c| c != '\n') {
            continue;
        }
        Ok(Some(self.emit(TokenType::Comment)))
    }
    /// Lex a String Name
    fn lex_name(&mut self) -> TechLefResult<Option<Token>> {
        while self.accept(|c| !c.is_whitespace() && c != ';') {
            continue;
        }
        Ok(Some(self.emit(TokenType::Name)))
    }
    /// Error-Generation Helper
    fn fail<T>(&self) -> TechLefResult<T> {
        Err(TechLefError::Lex {
            next_char: *self.peek_char(),
            line: self.line,
            pos: self.pos,
        })
    }
}
/// Iterator protocol for [TechLefLexer], handy for testing.
/// Panics on Lexer errors.
impl<'s> Iterator for TechLefLexer<'s> {
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
    SemiColon,
    StringLiteral,
    NewLine,
    WhiteSpace,
    Comment,
}
/// Enumerated parsing contexts, largely for capturing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechLefParseContext {
    Library,
    Units,
    Layer,
    Site,
    Macro,
    Pin,
    Port,
    Obstruction,
    Unknown,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechLefParseErrorType {
    /// A second SITE definition, or similar structural violations
    Unsupported { message: String },
    /// Invalid Value
    InvalidValue,
    /// Invalid Token
    InvalidToken { expected: TokenType },
    /// Syntax Error: missing keyword or identifier at a required location
    RequiredWord { expected: String },
    /// All other errors
    Other,
}

/// Keys recognized by the subset parser.
/// Parsed case-insensitively; anything else maps to [Key::Other].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Version,
    NamesCaseSensitive,
    BusBitChars,
    DividerChar,
    Units,
    Database,
    Microns,
    ManufacturingGrid,
    UseMinSpacing,
    ClearanceMeasure,
    PropertyDefinitions,
    Layer,
    Pitch,
    Via,
    Spacing,
    Site,
    Symmetry,
    Class,
    Size,
    By,
    Macro,
    Pin,
    Direction,
    Port,
    Obs,
    Rect,
    Polygon,
    End,
    Library,
    Other,
}
impl Key {
    /// Key parsing, performed case-insensitively
    fn parse(txt: &str) -> Self {
        match txt.to_ascii_uppercase().as_str() {
            "VERSION" => Self::Version,
            "NAMESCASESENSITIVE" => Self::NamesCaseSensitive,
            "BUSBITCHARS" => Self::BusBitChars,
            "DIVIDERCHAR" => Self::DividerChar,
            "UNITS" => Self::Units,
            "DATABASE" => Self::Database,
            "MICRONS" => Self::Microns,
            "MANUFACTURINGGRID" => Self::ManufacturingGrid,
            "USEMINSPACING" => Self::UseMinSpacing,
            "CLEARANCEMEASURE" => Self::ClearanceMeasure,
            "PROPERTYDEFINITIONS" => Self::PropertyDefinitions,
            "LAYER" => Self::Layer,
            "PITCH" => Self::Pitch,
            "VIA" => Self::Via,
            "SPACING" => Self::Spacing,
            "SITE" => Self::Site,
            "SYMMETRY" => Self::Symmetry,
            "CLASS" => Self::Class,
            "SIZE" => Self::Size,
            "BY" => Self::By,
            "MACRO" => Self::Macro,
            "PIN" => Self::Pin,
            "DIRECTION" => Self::Direction,
            "PORT" => Self::Port,
            "OBS" => Self::Obs,
            "RECT" => Self::Rect,
            "POLYGON" => Self::Polygon,
            "END" => Self::End,
            "LIBRARY" => Self::Library,
            _ => Self::Other,
        }
    }
}

/// TechLef Parser
/// Transforms input string of lifetime 'src into a [TechLefLibrary]
pub struct TechLefParser<'src> {
    /// Source string
    src: &'src str,
    /// Lexer
    lex: TechLefLexer<'src>,
    /// Context Stack
    ctx: Vec<TechLefParseContext>,
}
impl<'src> TechLefParser<'src> {
    /// Construct a [TechLefParser] of input-text `src`
    pub(crate) fn new(src: &'src str) -> TechLefResult<Self> {
        let lex = TechLefLexer::new(src)?;
        Ok(Self {
            src,
            lex,
            ctx: Vec::new(),
        })
    }
    /// Advance the lexer and get its next token
    #[inline(always)]
    fn next_token(&mut self) -> TechLefResult<Option<Token>> {
        self.lex.next_token()
    }
    /// Advance by a [Token] without returning it
    #[inline(always)]
    fn advance(&mut self) -> TechLefResult<()> {
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
    /// Peek at the [Key] denoted by the next token.
    /// Non-name tokens (numbers, semicolons) peek as [Key::Other].
    fn peek_key(&self) -> Key {
        match self.peek_token() {
            Some(tok) if tok.ttype == TokenType::Name => Key::parse(self.txt(tok)),
            _ => Key::Other,
        }
    }
    /// Assert the expectation that the next [Token] is of [TokenType] `ttype`.
    /// Returns the [Token] if so. Returns an [Err] if not.
    fn expect(&mut self, ttype: TokenType) -> TechLefResult<Token> {
        match self.next_token()? {
            Some(t) if t.ttype == ttype => Ok(t),
            _ => self.fail(TechLefParseErrorType::InvalidToken { expected: ttype }),
        }
    }
    /// Assert the next [Token] is a [TokenType::Name], and return its string value
    #[inline(always)]
    fn get_name(&mut self) -> TechLefResult<&str> {
        let tok = self.expect(TokenType::Name)?;
        Ok(self.txt(&tok))
    }
    /// Parse an identifier name, e.g. a macro, pin, or layer name
    fn parse_ident(&mut self) -> TechLefResult<String> {
        let txt = self.get_name()?;
        Ok(String::from(txt))
    }
    /// Assert that the next [Token] is a [TokenType::Name] matching `ident` literally
    fn expect_ident(&mut self, ident: &str) -> TechLefResult<()> {
        let txt = self.get_name()?;
        if txt == ident {
            Ok(())
        } else {
            self.fail(TechLefParseErrorType::RequiredWord {
                expected: String::from(ident),
            })
        }
    }
    /// Parse the next token into a [TechLefDecimal] number
    fn parse_number(&mut self) -> TechLefResult<TechLefDecimal> {
        let tok = self.expect(TokenType::Number)?;
        let txt = self.txt(&tok);
        Ok(TechLefDecimal::from_str(txt)?)
    }
    /// Parse a space-separated x,y [TechLefPoint]
    fn parse_point(&mut self) -> TechLefResult<TechLefPoint> {
        Ok(TechLefPoint::new(self.parse_number()?, self.parse_number()?))
    }
    /// Retrieve the text-content of lexer [Token] `tok`
    #[inline(always)]
    fn txt(&self, tok: &Token) -> &str {
        tok.substr(self.src)
    }
    /// Skip the remainder of a statement, consuming through its semicolon
    fn skip_statement(&mut self) -> TechLefResult<()> {
        loop {
            match self.next_token()? {
                Some(t) if t.ttype == TokenType::SemiColon => return Ok(()),
                Some(_) => continue,
                None => {
                    return self.fail(TechLefParseErrorType::InvalidToken {
                        expected: TokenType::SemiColon,
                    })
                }
            }
        }
    }
    /// Skip a whole block, consuming through its `END <close>` delimiter
    fn skip_block(&mut self, close: &str) -> TechLefResult<()> {
        loop {
            match self.next_token()? {
                Some(t) if t.ttype == TokenType::Name && Key::parse(self.txt(&t)) == Key::End => {
                    // Note [Token] is `Copy`; copying out frees the borrow for `advance`
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
                    return self.fail(TechLefParseErrorType::RequiredWord {
                        expected: format!("END {}", close),
                    })
                }
            }
        }
    }
    /// Parse a [TechLefLibrary]
    fn parse_lib(&mut self) -> TechLefResult<TechLefLibrary> {
        self.ctx.push(TechLefParseContext::Library);
        let mut lib = TechLefLibrary::default();
        let mut sites: Vec<TechLefSite> = Vec::new();
        loop {
            if self.peek_token().is_none() {
                break; // End of input is a valid library end
            }
            match self.peek_key() {
                Key::Version => {
                    self.advance()?;
                    lib.version = Some(self.parse_number()?);
                    self.expect(TokenType::SemiColon)?;
                }
                Key::BusBitChars => {
                    self.advance()?;
                    lib.bus_bit_chars = Some(self.parse_bus_bit_chars()?);
                }
                Key::DividerChar => {
                    self.advance()?;
                    lib.divider_char = Some(self.parse_divider_char()?);
                }
                Key::Units => {
                    self.advance()?;
                    self.parse_units(&mut lib)?;
                }
                Key::ManufacturingGrid => {
                    self.advance()?;
                    lib.manufacturing_grid = Some(self.parse_number()?);
                    self.expect(TokenType::SemiColon)?;
                }
                Key::Layer => {
                    self.advance()?;
                    self.parse_layer(&mut lib)?;
                }
                Key::Site => {
                    self.advance()?;
                    sites.push(self.parse_site()?);
                }
                Key::Macro => {
                    self.advance()?;
                    let mac = self.parse_macro()?;
                    lib.macros.push(mac);
                }
                Key::Via => {
                    self.advance()?;
                    let name = self.parse_ident()?;
                    self.skip_block(&name)?;
                }
                Key::PropertyDefinitions => {
                    self.advance()?;
                    self.skip_block("PROPERTYDEFINITIONS")?;
                }
                Key::Spacing => {
                    self.advance()?;
                    self.skip_block("SPACING")?;
                }
                Key::End => {
                    self.advance()?;
                    // `END LIBRARY` closes the file
                    match self.peek_key() {
                        Key::Library => {
                            self.advance()?;
                            break;
                        }
                        _ => {
                            return self.fail(TechLefParseErrorType::RequiredWord {
                                expected: "LIBRARY".to_string(),
                            })
                        }
                    }
                }
                // NAMESCASESENSITIVE, USEMINSPACING, CLEARANCEMEASURE,
                // and anything else single-statement shaped
                _ => {
                    if !self.matches(TokenType::Name) {
                        return self.fail(TechLefParseErrorType::InvalidToken {
                            expected: TokenType::Name,
                        });
                    }
                    self.skip_statement()?;
                }
            }
        }
        if sites.len() != 1 {
            return self.fail(TechLefParseErrorType::Unsupported {
                message: format!("{} site definitions (exactly one supported)", sites.len()),
            });
        }
        lib.site = sites.remove(0);
        self.ctx.pop();
        Ok(lib)
    }
    /// Parse the UNITS block, keeping the `DATABASE MICRONS` scale
    fn parse_units(&mut self, lib: &mut TechLefLibrary) -> TechLefResult<()> {
        self.ctx.push(TechLefParseContext::Units);
        loop {
            match self.peek_key() {
                Key::Database => {
                    self.advance()?;
                    self.expect_keyword(Key::Microns, "MICRONS")?;
                    let num = self.parse_number()?;
                    self.expect(TokenType::SemiColon)?;
                    lib.dbu_per_micron = Some(TechLefDbuPerMicron::try_new(num)?);
                }
                Key::End => {
                    self.advance()?;
                    self.expect_keyword(Key::Units, "UNITS")?;
                    break;
                }
                _ => self.skip_statement()?, // TIME, CAPACITANCE, etc.
            }
        }
        self.ctx.pop();
        Ok(())
    }
    /// Parse a LAYER block, keeping only its routing pitch (when declared)
    fn parse_layer(&mut self, lib: &mut TechLefLibrary) -> TechLefResult<()> {
        self.ctx.push(TechLefParseContext::Layer);
        let name = self.parse_ident()?;
        loop {
            match self.peek_key() {
                Key::Pitch => {
                    self.advance()?;
                    let pitch = self.parse_number()?;
                    // A second, y-direction pitch value is accepted and dropped
                    if self.matches(TokenType::Number) {
                        self.advance()?;
                    }
                    self.expect(TokenType::SemiColon)?;
                    lib.layer_pitches.insert(name.clone(), pitch);
                }
                Key::End => {
                    self.advance()?;
                    self.expect_ident(&name)?;
                    break;
                }
                _ => self.skip_statement()?, // TYPE, WIDTH, SPACINGTABLE, etc.
            }
        }
        self.ctx.pop();
        Ok(())
    }
    /// Parse a SITE definition
    fn parse_site(&mut self) -> TechLefResult<TechLefSite> {
        self.ctx.push(TechLefParseContext::Site);
        let mut site = TechLefSite {
            name: self.parse_ident()?,
            ..Default::default()
        };
        loop {
            match self.peek_key() {
                Key::Class => {
                    self.advance()?;
                    site.class = self.parse_ident()?;
                    self.expect(TokenType::SemiColon)?;
                }
                Key::Symmetry => {
                    self.advance()?;
                    while self.matches(TokenType::Name) {
                        site.symmetry.push(self.parse_ident()?);
                    }
                    self.expect(TokenType::SemiColon)?;
                }
                Key::Size => {
                    let (w, h) = self.parse_size()?;
                    site.width = w;
                    site.height = h;
                }
                Key::End => {
                    self.advance()?;
                    self.expect_ident(&site.name)?;
                    break;
                }
                _ => self.skip_statement()?,
            }
        }
        self.ctx.pop();
        Ok(site)
    }
    /// Parse a MACRO definition
    fn parse_macro(&mut self) -> TechLefResult<TechLefMacro> {
        self.ctx.push(TechLefParseContext::Macro);
        let name = self.parse_ident()?;
        let mut class: Option<MacroClass> = None;
        let mut size: Option<(TechLefDecimal, TechLefDecimal)> = None;
        let mut pins: Vec<TechLefPin> = Vec::new();
        let mut obstructions: Vec<TechLefRect> = Vec::new();
        loop {
            match self.peek_key() {
                Key::Class => {
                    self.advance()?;
                    let txt = self.parse_ident()?;
                    class = match MacroClass::parse(&txt) {
                        Some(c) => Some(c),
                        None => return self.fail(TechLefParseErrorType::InvalidValue),
                    };
                    // Any sub-type tag (e.g. `BLOCK SOFT`) is dropped
                    self.skip_statement()?;
                }
                Key::Size => size = Some(self.parse_size()?),
                Key::Pin => {
                    self.advance()?;
                    pins.push(self.parse_pin()?);
                }
                Key::Obs => {
                    self.advance()?;
                    obstructions = self.parse_obstructions()?;
                }
                Key::End => {
                    self.advance()?;
                    self.expect_ident(&name)?;
                    break;
                }
                // FOREIGN, ORIGIN, SYMMETRY, SITE, and friends
                _ => self.skip_statement()?,
            }
        }
        let class = match class {
            Some(c) => c,
            None => {
                return self.fail_msg(
                    TechLefParseErrorType::Other,
                    format!("macro {} has no CLASS", name),
                )
            }
        };
        let (width, height) = match size {
            Some(s) => s,
            None => {
                return self.fail_msg(
                    TechLefParseErrorType::Other,
                    format!("macro {} has no SIZE", name),
                )
            }
        };
        self.ctx.pop();
        Ok(TechLefMacro {
            name,
            class,
            width,
            height,
            pins,
            footprint: MacroFootprint::from_obstructions(obstructions),
        })
    }
    /// Parse a MACRO::PIN definition into a [TechLefPin]
    fn parse_pin(&mut self) -> TechLefResult<TechLefPin> {
        self.ctx.push(TechLefParseContext::Pin);
        let name = self.parse_ident()?;
        let mut direction: Option<PinDirection> = None;
        let mut bbox: Option<TechLefRect> = None;
        loop {
            match self.peek_key() {
                Key::Direction => {
                    self.advance()?;
                    let txt = self.parse_ident()?;
                    direction = match PinDirection::parse(&txt) {
                        Some(d) => Some(d),
                        None => return self.fail(TechLefParseErrorType::InvalidValue),
                    };
                    // An optional TRISTATE tag is dropped
                    self.skip_statement()?;
                }
                Key::Port => {
                    self.advance()?;
                    if let Some(rect) = self.parse_port()? {
                        bbox = Some(rect);
                    }
                }
                Key::End => {
                    self.advance()?;
                    self.expect_ident(&name)?;
                    break;
                }
                // USE, SHAPE, ANTENNA attributes, etc.
                _ => self.skip_statement()?,
            }
        }
        let direction = match direction {
            Some(d) => d,
            None => {
                return self.fail_msg(
                    TechLefParseErrorType::Other,
                    format!("pin {} has no DIRECTION", name),
                )
            }
        };
        let bbox = match bbox {
            Some(b) => b,
            None => {
                return self.fail_msg(
                    TechLefParseErrorType::Other,
                    format!("pin {} has no geometry", name),
                )
            }
        };
        self.ctx.pop();
        Ok(TechLefPin {
            name,
            direction,
            bbox,
        })
    }
    /// Parse a PIN::PORT block. Returns the bounding rectangle of its
    /// geometry; when several statements appear, the last one wins.
    fn parse_port(&mut self) -> TechLefResult<Option<TechLefRect>> {
        self.ctx.push(TechLefParseContext::Port);
        let mut bbox: Option<TechLefRect> = None;
        loop {
            match self.peek_key() {
                Key::Layer => {
                    self.advance()?;
                    let _layer = self.parse_ident()?;
                    self.expect(TokenType::SemiColon)?;
                }
                Key::Rect => {
                    self.advance()?;
                    let ll = self.parse_point()?;
                    let ur = self.parse_point()?;
                    self.expect(TokenType::SemiColon)?;
                    bbox = Some(TechLefRect::new(ll, ur));
                }
                Key::Polygon => {
                    self.advance()?;
                    let mut points = Vec::new();
                    while self.matches(TokenType::Number) {
                        points.push(self.parse_point()?);
                    }
                    self.expect(TokenType::SemiColon)?;
                    match TechLefRect::bbox_of(&points) {
                        Some(b) => bbox = Some(b),
                        None => return self.fail(TechLefParseErrorType::InvalidValue),
                    }
                }
                Key::End => {
                    self.advance()?;
                    break;
                }
                _ => self.skip_statement()?, // VIA, WIDTH, CLASS, etc.
            }
        }
        self.ctx.pop();
        Ok(bbox)
    }
    /// Parse a MACRO::OBS block into its rectangle list
    fn parse_obstructions(&mut self) -> TechLefResult<Vec<TechLefRect>> {
        self.ctx.push(TechLefParseContext::Obstruction);
        let mut rects = Vec::new();
        loop {
            match self.peek_key() {
                Key::Layer => {
                    self.advance()?;
                    let _layer = self.parse_ident()?;
                    self.expect(TokenType::SemiColon)?;
                }
                Key::Rect => {
                    self.advance()?;
                    let ll = self.parse_point()?;
                    let ur = self.parse_point()?;
                    self.expect(TokenType::SemiColon)?;
                    rects.push(TechLefRect::new(ll, ur));
                }
                Key::End => {
                    self.advance()?;
                    break;
                }
                _ => self.skip_statement()?, // POLYGON obstructions are dropped
            }
        }
        self.ctx.pop();
        Ok(rects)
    }
    /// Parse the SIZE statement into an (x, y) pair of [TechLefDecimal]s
    fn parse_size(&mut self) -> TechLefResult<(TechLefDecimal, TechLefDecimal)> {
        self.expect_keyword(Key::Size, "SIZE")?;
        let x = self.parse_number()?;
        self.expect_keyword(Key::By, "BY")?;
        let y = self.parse_number()?;
        self.expect(TokenType::SemiColon)?;
        Ok((x, y))
    }
    /// Parse the BUSBITCHARS key from a two-character string literal
    fn parse_bus_bit_chars(&mut self) -> TechLefResult<(char, char)> {
        let tok = self.expect(TokenType::StringLiteral)?;
        let chars: Vec<char> = self.txt(&tok).chars().collect();
        if chars.len() != 4 {
            return self.fail(TechLefParseErrorType::InvalidValue);
        }
        self.expect(TokenType::SemiColon)?;
        Ok((chars[1], chars[2]))
    }
    /// Parse the DIVIDERCHAR key from a single-character string literal
    fn parse_divider_char(&mut self) -> TechLefResult<char> {
        let tok = self.expect(TokenType::StringLiteral)?;
        let chars: Vec<char> = self.txt(&tok).chars().collect();
        if chars.len() != 3 {
            return self.fail(TechLefParseErrorType::InvalidValue);
        }
        self.expect(TokenType::SemiColon)?;
        Ok(chars[1])
    }
    /// Assert that the next [Token] denotes [Key] `key`
    fn expect_keyword(&mut self, key: Key, word: &str) -> TechLefResult<()> {
        if self.peek_key() != key {
            return self.fail(TechLefParseErrorType::RequiredWord {
                expected: String::from(word),
            });
        }
        self.advance()
    }
    /// Error-Generation Helper
    fn fail<T>(&self, tp: TechLefParseErrorType) -> TechLefResult<T> {
        Err(TechLefError::Parse {
            tp,
            msg: None,
            state: self.state(),
        })
    }
    /// Error-Generation Helper
    fn fail_msg<T>(&self, tp: TechLefParseErrorType, msg: impl Into<String>) -> TechLefResult<T> {
        Err(TechLefError::Parse {
            tp,
            msg: Some(msg.into()),
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
    ctx: Vec<TechLefParseContext>,
    token: String,
    line_content: String,
    line_num: usize,
    pos: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_lexes() -> TechLefResult<()> {
        let src = "MACRO in01f80 ; \n # commentary \n";
        let lex = TechLefLexer::new(src)?;
        let toks_vec: Vec<Token> = lex.collect();
        let tok_strs: Vec<&str> = toks_vec.iter().map(|t| t.substr(src)).collect();
        assert_eq!(tok_strs, vec!["MACRO", "in01f80", ";"]);
        Ok(())
    }
    #[test]
    fn it_skips_unknown_blocks() -> TechLefResult<()> {
        let src = r#"
        VERSION 5.7 ;
        VIA M2_M1 DEFAULT
            LAYER metal1 ;
            RECT -0.065 -0.07 0.065 0.07 ;
        END M2_M1
        SITE core
            SIZE 0.2 BY 1.6 ;
        END core
        END LIBRARY
        "#;
        let lib = parse_str(src)?;
        assert_eq!(lib.site.name, "core");
        Ok(())
    }
}

//! Source scanning: unit names, imports and top-level function declarations
//!
//! The build only needs a shallow view of each file: the declared unit name,
//! the import paths, and (for test synthesis) the signatures of top-level
//! functions. [`SourceScanner`] extracts these from the `package` / `import` /
//! `func` dialect with a `logos` tokenizer instead of a full parser.

use crate::error::{BuildError, BuildResult};
use logos::Logos;
use std::fs;
use std::path::Path;

/// Declared unit name and imports of a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHeader {
    pub name: String,
    pub imports: Vec<String>,
}

/// A top-level function declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    /// Number of declared parameters
    pub arity: usize,
    /// Declared on a receiver (a method)
    pub has_receiver: bool,
    /// Declares result values
    pub has_results: bool,
}

/// Extracts import lists and declarations from source files
///
/// Failure to parse a file is fatal to the whole build, so implementations
/// report errors instead of skipping files.
pub trait UnitParser: Sync {
    /// Cheap imports-only parse
    fn header(&self, path: &Path) -> BuildResult<UnitHeader>;

    /// Fuller parse listing top-level functions
    fn declarations(&self, path: &Path) -> BuildResult<Vec<FunctionDecl>>;
}

/// Default [`UnitParser`] backed by a `logos` tokenizer
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceScanner;

impl SourceScanner {
    pub fn new() -> Self {
        Self
    }

    fn read(path: &Path) -> BuildResult<String> {
        fs::read_to_string(path).map_err(|e| BuildError::io(path, e))
    }
}

impl UnitParser for SourceScanner {
    fn header(&self, path: &Path) -> BuildResult<UnitHeader> {
        let source = Self::read(path)?;
        scan_header(&source).map_err(|message| BuildError::parse(path, message))
    }

    fn declarations(&self, path: &Path) -> BuildResult<Vec<FunctionDecl>> {
        let source = Self::read(path)?;
        scan_header(&source).map_err(|message| BuildError::parse(path, message))?;
        Ok(scan_declarations(&source))
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[regex(r"//[^\n]*")]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,

    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("func")]
    Func,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Ident,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"`[^`]*`")]
    Str,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    Rune,

    #[regex(r"[0-9][0-9A-Za-z_.]*")]
    Number,
}

/// A token with its source text; `None` for characters the dialect
/// does not care about (operators and the like)
#[derive(Debug, Clone, Copy)]
struct Lexeme<'src> {
    token: Option<Token>,
    text: &'src str,
}

fn tokenize(source: &str) -> Vec<Lexeme<'_>> {
    let mut lexer = Token::lexer(source);
    let mut out = Vec::new();
    while let Some(result) = lexer.next() {
        let token = result.ok();
        if token == Some(Token::Comment) {
            continue;
        }
        out.push(Lexeme {
            token,
            text: lexer.slice(),
        });
    }
    out
}

struct Cursor<'a, 'src> {
    lexemes: &'a [Lexeme<'src>],
    pos: usize,
}

impl<'a, 'src> Cursor<'a, 'src> {
    fn new(lexemes: &'a [Lexeme<'src>]) -> Self {
        Self { lexemes, pos: 0 }
    }

    fn peek(&self) -> Option<Token> {
        self.lexemes.get(self.pos).and_then(|l| l.token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    fn bump(&mut self) -> Option<Lexeme<'src>> {
        let lexeme = self.lexemes.get(self.pos).copied();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn eat(&mut self, token: Token) -> Option<Lexeme<'src>> {
        if self.peek() == Some(token) {
            self.bump()
        } else {
            None
        }
    }

    /// Skip a balanced group whose opening token is the current one
    fn skip_group(&mut self) {
        let mut depth = 0usize;
        while let Some(lexeme) = self.bump() {
            match lexeme.token {
                Some(Token::LParen | Token::LBrace | Token::LBracket) => depth += 1,
                Some(Token::RParen | Token::RBrace | Token::RBracket) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }
}

fn unquote(literal: &str) -> &str {
    if literal.len() >= 2 {
        &literal[1..literal.len() - 1]
    } else {
        literal
    }
}

/// Parse the package clause and import declarations of a source file
pub fn scan_header(source: &str) -> Result<UnitHeader, String> {
    let lexemes = tokenize(source);
    let mut cursor = Cursor::new(&lexemes);

    if cursor.eat(Token::Package).is_none() {
        return Err("expected 'package' clause".to_string());
    }
    let name = cursor
        .eat(Token::Ident)
        .ok_or_else(|| "expected package name after 'package'".to_string())?
        .text
        .to_string();

    let mut imports = Vec::new();
    loop {
        match cursor.peek() {
            Some(Token::Semi) => {
                cursor.bump();
            }
            Some(Token::Import) => {
                cursor.bump();
                if cursor.eat(Token::LParen).is_some() {
                    loop {
                        if cursor.eat(Token::RParen).is_some() {
                            break;
                        }
                        if cursor.eat(Token::Semi).is_some() {
                            continue;
                        }
                        if cursor.at_end() {
                            return Err("unterminated import group".to_string());
                        }
                        imports.push(import_spec(&mut cursor)?);
                    }
                } else {
                    imports.push(import_spec(&mut cursor)?);
                }
            }
            _ => break,
        }
    }

    Ok(UnitHeader { name, imports })
}

fn import_spec(cursor: &mut Cursor<'_, '_>) -> Result<String, String> {
    // optional alias: identifier, blank identifier or dot
    if cursor.eat(Token::Ident).is_none() {
        cursor.eat(Token::Dot);
    }
    cursor
        .eat(Token::Str)
        .map(|lexeme| unquote(lexeme.text).to_string())
        .ok_or_else(|| "expected import path".to_string())
}

/// List the top-level function declarations of a source file
pub fn scan_declarations(source: &str) -> Vec<FunctionDecl> {
    let lexemes = tokenize(source);
    let mut cursor = Cursor::new(&lexemes);
    let mut decls = Vec::new();
    let mut depth = 0usize;

    while !cursor.at_end() {
        match cursor.peek() {
            Some(Token::Func) if depth == 0 => {
                cursor.bump();
                if let Some(decl) = function_decl(&mut cursor) {
                    decls.push(decl);
                }
            }
            Some(Token::LParen | Token::LBrace | Token::LBracket) => {
                depth += 1;
                cursor.bump();
            }
            Some(Token::RParen | Token::RBrace | Token::RBracket) => {
                depth = depth.saturating_sub(1);
                cursor.bump();
            }
            _ => {
                cursor.bump();
            }
        }
    }

    decls
}

fn function_decl(cursor: &mut Cursor<'_, '_>) -> Option<FunctionDecl> {
    let has_receiver = cursor.peek() == Some(Token::LParen);
    if has_receiver {
        cursor.skip_group();
    }
    let name = cursor.eat(Token::Ident)?.text.to_string();
    if cursor.peek() == Some(Token::LBracket) {
        cursor.skip_group();
    }
    if cursor.peek() != Some(Token::LParen) {
        return None;
    }
    let arity = parameter_count(cursor);
    let has_results = match cursor.lexemes.get(cursor.pos) {
        None => false,
        Some(lexeme) => !matches!(
            lexeme.token,
            Some(Token::LBrace | Token::RBrace | Token::Semi | Token::Func)
        ),
    };

    Some(FunctionDecl {
        name,
        arity,
        has_receiver,
        has_results,
    })
}

/// Count comma-separated parameters of the group at the cursor
fn parameter_count(cursor: &mut Cursor<'_, '_>) -> usize {
    let mut depth = 0usize;
    let mut count = 0usize;
    let mut segment_empty = true;

    while let Some(lexeme) = cursor.bump() {
        match lexeme.token {
            Some(Token::LParen | Token::LBrace | Token::LBracket) => {
                depth += 1;
                if depth > 1 {
                    segment_empty = false;
                }
            }
            Some(Token::RParen | Token::RBrace | Token::RBracket) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Some(Token::Comma) if depth == 1 => {
                if !segment_empty {
                    count += 1;
                }
                segment_empty = true;
            }
            _ => segment_empty = false,
        }
    }

    if !segment_empty {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_header_single_imports() {
        let header = scan_header(
            r#"
// Package lexer splits input.
package lexer

import "fmt"
import str "strings"
import _ "embed"

func Lex() {}
"#,
        )
        .unwrap();

        assert_eq!(header.name, "lexer");
        assert_eq!(header.imports, vec!["fmt", "strings", "embed"]);
    }

    #[test]
    fn test_header_grouped_imports() {
        let header = scan_header(
            r#"package main

import (
    "os"
    . "math"
    /* block comment */
    cfg "app/config"; "app/util"
)

var x = "import \"ignored\""
"#,
        )
        .unwrap();

        assert_eq!(header.name, "main");
        assert_eq!(header.imports, vec!["os", "math", "app/config", "app/util"]);
    }

    #[test]
    fn test_header_stops_at_first_declaration() {
        let header = scan_header("package a\nfunc f() {}\nimport \"late\"\n").unwrap();
        assert!(header.imports.is_empty());
    }

    #[test]
    fn test_header_unicode_unit_name() {
        let header = scan_header("package café\nimport \"日本/語\"\n").unwrap();
        assert_eq!(header.name, "café");
        assert_eq!(header.imports, vec!["日本/語"]);

        let decls = scan_declarations("package café\nfunc TestÜber2(t *T) {}\n");
        assert_eq!(decls[0].name, "TestÜber2");
    }

    #[test]
    fn test_header_raw_string_import() {
        let header = scan_header("package a\nimport `raw/path`\n").unwrap();
        assert_eq!(header.imports, vec!["raw/path"]);
    }

    #[rstest]
    #[case("")]
    #[case("import \"fmt\"")]
    #[case("package")]
    #[case("package a\nimport (\n\"fmt\"\n")]
    #[case("package a\nimport alias\n")]
    fn test_header_errors(#[case] source: &str) {
        assert!(scan_header(source).is_err());
    }

    #[test]
    fn test_declarations() {
        let decls = scan_declarations(
            r#"package calc_test

import "testing"

func TestAdd(t *testing.T) {
    f := func(a, b int) int { return a + b }
    _ = f
}

func BenchmarkAdd(b *testing.B) {}

func ExampleAdd() {}

func helper(a, b int, c string) (int, error) { return 0, nil }

func ptr() *Thing { return nil }

func (s *Suite) TestMethod(t *testing.T) {}

func Map[T any](xs []T, f func(T) T) []T { return xs }

func init() {}
"#,
        );

        let summary: Vec<_> = decls
            .iter()
            .map(|d| (d.name.as_str(), d.arity, d.has_receiver, d.has_results))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("TestAdd", 1, false, false),
                ("BenchmarkAdd", 1, false, false),
                ("ExampleAdd", 0, false, false),
                ("helper", 3, false, true),
                ("ptr", 0, false, true),
                ("TestMethod", 1, true, false),
                ("Map", 2, false, true),
                ("init", 0, false, false),
            ]
        );
    }

    #[test]
    fn test_scanner_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "package a\nimport \"b\"\nfunc TestA(t *T) {}\n").unwrap();

        let scanner = SourceScanner::new();
        assert_eq!(scanner.header(&path).unwrap().imports, vec!["b"]);
        assert_eq!(scanner.declarations(&path).unwrap().len(), 1);

        let missing = scanner.header(&dir.path().join("missing.go"));
        assert!(matches!(missing, Err(BuildError::IoError { .. })));
    }
}

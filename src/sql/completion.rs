//! Cursor-aware completion for the query editor.
//!
//! The text before the cursor is tokenized leniently to find the partial word
//! being typed and the clause it sits in. Table scope comes from a token scan
//! of the whole statement, so columns are offered even when FROM is written
//! after the cursor.

use super::lexer::Lexer;
use super::token::{Token, TokenType};
use crate::catalog::TableSource;
use crate::types::TableInfo;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Keyword,
    Table,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
    /// Byte range `[word_start, cursor]` the suggestion replaces
    pub replace_range: [usize; 2],
}

const EXPRESSION_KEYWORDS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX", "NOT", "NULL", "TRUE", "FALSE"];
const AFTER_TABLE_KEYWORDS: &[&str] = &["AS", "JOIN", "INNER", "LEFT", "ON", "WHERE", "GROUP", "ORDER", "LIMIT"];

/// Clause the cursor is in, from the last clause keyword before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    From,
    Join,
    On,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
}

/// A table visible to the statement, with the name other clauses use for it
struct ScopeTable {
    alias: String,
    info: TableInfo,
}

/// Ranked suggestions for `sql` with the cursor at byte offset `cursor`
pub fn suggest<S: TableSource + ?Sized>(sql: &str, cursor: usize, source: &S) -> Vec<Suggestion> {
    let mut cursor = cursor.min(sql.len());
    while !sql.is_char_boundary(cursor) {
        cursor -= 1;
    }

    let prefix = &sql[..cursor];
    let word_start = prefix
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(cursor);
    let partial = &prefix[word_start..];

    let tokens = Lexer::new(&sql[..word_start]).tokenize_lenient();
    if inside_literal_or_comment(&tokens, word_start) {
        return Vec::new();
    }
    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !t.is_trivia() && !matches!(t.token_type, TokenType::Eof))
        .collect();

    let candidates = candidates(&significant, sql, source);
    rank(candidates, partial, [word_start, cursor])
}

/// Unterminated string or comment before the word, or a line comment running to it
fn inside_literal_or_comment(tokens: &[Token], word_start: usize) -> bool {
    let Some(eof) = tokens.last() else {
        return false;
    };
    if eof.start < word_start {
        return true;
    }
    tokens
        .iter()
        .rev()
        .find(|t| !matches!(t.token_type, TokenType::Eof))
        .is_some_and(|t| {
            matches!(t.token_type, TokenType::Comment) && t.text.starts_with("--") && t.end == word_start
        })
}

fn candidates<S: TableSource + ?Sized>(tokens: &[&Token], sql: &str, source: &S) -> Vec<(String, SuggestionKind)> {
    let Some(prev) = tokens.last() else {
        return keywords(&["SELECT"]);
    };

    // qualifier.<cursor>
    if matches!(prev.token_type, TokenType::Dot) {
        let qualifier = match tokens.len().checked_sub(2).map(|i| &tokens[i].token_type) {
            Some(TokenType::Identifier(q)) | Some(TokenType::QuotedIdentifier(q)) => q.clone(),
            _ => return Vec::new(),
        };
        return qualified_columns(&qualifier, sql, source);
    }

    let clause = current_clause(tokens);

    match (&prev.token_type, clause) {
        (TokenType::From | TokenType::Join, _) => tables(source),
        (TokenType::Comma, Some(Clause::From)) => tables(source),
        (TokenType::Group | TokenType::Order, _) => keywords(&["BY"]),
        (TokenType::As | TokenType::Top | TokenType::Limit, _) => Vec::new(),
        (TokenType::Identifier(_) | TokenType::QuotedIdentifier(_), Some(Clause::From | Clause::Join)) => {
            keywords(AFTER_TABLE_KEYWORDS)
        }
        (_, Some(Clause::From | Clause::Join | Clause::Limit)) | (_, None) => Vec::new(),
        (tt, Some(clause)) if ends_operand(tt) => keywords(continuation_keywords(clause)),
        (tt, Some(clause)) => {
            let mut out = scope_columns(sql, source);
            if clause == Clause::Select && matches!(tt, TokenType::Select) {
                out.extend(keywords(&["DISTINCT", "TOP"]));
            }
            out.extend(keywords(EXPRESSION_KEYWORDS));
            out
        }
    }
}

fn current_clause(tokens: &[&Token]) -> Option<Clause> {
    tokens.iter().rev().find_map(|t| match t.token_type {
        TokenType::Select => Some(Clause::Select),
        TokenType::From => Some(Clause::From),
        TokenType::Join => Some(Clause::Join),
        TokenType::On => Some(Clause::On),
        TokenType::Where => Some(Clause::Where),
        TokenType::Group => Some(Clause::GroupBy),
        TokenType::Having => Some(Clause::Having),
        TokenType::Order => Some(Clause::OrderBy),
        TokenType::Limit => Some(Clause::Limit),
        _ => None,
    })
}

/// Tokens after which an expression is complete and a keyword may follow
fn ends_operand(token_type: &TokenType) -> bool {
    matches!(
        token_type,
        TokenType::Identifier(_)
            | TokenType::QuotedIdentifier(_)
            | TokenType::Number(_)
            | TokenType::String(_)
            | TokenType::RParen
            | TokenType::Null
            | TokenType::True
            | TokenType::False
            | TokenType::Star
    )
}

fn continuation_keywords(clause: Clause) -> &'static [&'static str] {
    match clause {
        Clause::Select => &["AS", "FROM"],
        Clause::On => &["AND", "OR", "IN", "LIKE", "IS", "NOT", "JOIN", "LEFT", "INNER", "WHERE", "GROUP", "ORDER", "LIMIT"],
        Clause::Where | Clause::Having => &["AND", "OR", "IN", "LIKE", "IS", "NOT", "GROUP", "ORDER", "LIMIT"],
        Clause::GroupBy => &["HAVING", "ORDER", "LIMIT"],
        Clause::OrderBy => &["ASC", "DESC", "LIMIT"],
        Clause::From | Clause::Join | Clause::Limit => &[],
    }
}

fn keywords(words: &[&str]) -> Vec<(String, SuggestionKind)> {
    words.iter().map(|w| (w.to_string(), SuggestionKind::Keyword)).collect()
}

fn tables<S: TableSource + ?Sized>(source: &S) -> Vec<(String, SuggestionKind)> {
    source.list().into_iter().map(|t| (t.name, SuggestionKind::Table)).collect()
}

/// Tables named in FROM/JOIN anywhere in the statement; every table when none
fn scope<S: TableSource + ?Sized>(sql: &str, source: &S) -> Vec<ScopeTable> {
    let tokens: Vec<Token> = Lexer::new(sql)
        .tokenize_lenient()
        .into_iter()
        .filter(|t| !t.is_trivia())
        .collect();

    let mut found = Vec::new();
    let mut in_from = false;
    let mut expect_table = false;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].token_type {
            TokenType::From => {
                in_from = true;
                expect_table = true;
            }
            TokenType::Join => expect_table = true,
            TokenType::Comma if in_from => expect_table = true,
            TokenType::Identifier(name) | TokenType::QuotedIdentifier(name) if expect_table => {
                expect_table = false;
                let mut alias = None;
                let mut next = i + 1;
                if matches!(tokens.get(next).map(|t| &t.token_type), Some(TokenType::As)) {
                    next += 1;
                }
                if let Some(TokenType::Identifier(a) | TokenType::QuotedIdentifier(a)) =
                    tokens.get(next).map(|t| &t.token_type)
                {
                    alias = Some(a.clone());
                    i = next;
                }
                if let Ok(table) = source.lookup(name) {
                    found.push(ScopeTable {
                        alias: alias.unwrap_or_else(|| table.name().to_string()),
                        info: table.info(),
                    });
                }
            }
            TokenType::On
            | TokenType::Where
            | TokenType::Group
            | TokenType::Having
            | TokenType::Order
            | TokenType::Limit
            | TokenType::Select => {
                in_from = false;
                expect_table = false;
            }
            _ => expect_table = false,
        }
        i += 1;
    }

    if found.is_empty() {
        found = source
            .list()
            .into_iter()
            .map(|info| ScopeTable {
                alias: info.name.clone(),
                info,
            })
            .collect();
    }
    found
}

/// Columns in scope, qualified with their table's alias when the bare name is ambiguous
fn scope_columns<S: TableSource + ?Sized>(sql: &str, source: &S) -> Vec<(String, SuggestionKind)> {
    let scope = scope(sql, source);
    let occurrences = |name: &str| {
        scope
            .iter()
            .filter(|t| t.info.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)))
            .count()
    };

    let mut out = Vec::new();
    for table in &scope {
        for column in &table.info.columns {
            let text = if occurrences(&column.name) > 1 {
                format!("{}.{}", table.alias, column.name)
            } else {
                column.name.clone()
            };
            out.push((text, SuggestionKind::Column));
        }
    }
    out
}

fn qualified_columns<S: TableSource + ?Sized>(qualifier: &str, sql: &str, source: &S) -> Vec<(String, SuggestionKind)> {
    let scope = scope(sql, source);
    let info = scope
        .iter()
        .find(|t| t.alias.eq_ignore_ascii_case(qualifier))
        .or_else(|| scope.iter().find(|t| t.info.name.eq_ignore_ascii_case(qualifier)))
        .map(|t| t.info.clone())
        .or_else(|| source.lookup(qualifier).ok().map(|t| t.info()));

    match info {
        Some(info) => info
            .columns
            .into_iter()
            .map(|c| (c.name, SuggestionKind::Column))
            .collect(),
        None => Vec::new(),
    }
}

/// Prefix matches first, then substring matches; alphabetical within each
fn rank(candidates: Vec<(String, SuggestionKind)>, partial: &str, replace_range: [usize; 2]) -> Vec<Suggestion> {
    let needle = partial.to_lowercase();

    let mut scored: Vec<(u8, String, Suggestion)> = Vec::new();
    for (text, kind) in candidates {
        let lower = text.to_lowercase();
        let rank = if lower.starts_with(&needle) {
            0
        } else if lower.contains(&needle) {
            1
        } else {
            continue;
        };
        if scored.iter().any(|(_, _, s)| s.text == text && s.kind == kind) {
            continue;
        }
        scored.push((
            rank,
            lower,
            Suggestion {
                text,
                kind,
                replace_range,
            },
        ));
    }

    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, _, s)| s).collect()
}

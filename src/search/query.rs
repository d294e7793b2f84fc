//! Forum query construction and execution
//!
//! A query string is analyzed with the same analyzer the forum fields are
//! indexed with, then expanded into two scored clauses:
//!
//! * a typo tolerant match over `title` and `description`, taking the best
//!   scoring field per document, with `title` weighted higher
//! * a phrase prefix match over `title`, so partially typed titles rank first
//!
//! A document matching either clause is a hit. Highlighting marks every
//! index term either clause expanded to, not only the literal query tokens.

use crate::search::document::ForumFields;
use crate::search::error::SearchResult;
use crate::search::index::ForumIndex;
use lazy_static::lazy_static;
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use tantivy::collector::TopDocs;
use tantivy::query::{
    BooleanQuery, BoostQuery, DisjunctionMaxQuery, FuzzyTermQuery, Occur, PhrasePrefixQuery, Query,
    TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::snippet::{Snippet, SnippetGenerator};
use tantivy::tokenizer::TokenStream;
use tantivy::{Score, Searcher, TantivyDocument, Term};

/// Weight of `title` relative to `description` in the typo tolerant clause
pub const TITLE_BOOST: Score = 2.0;

/// Weight of the title phrase prefix clause
pub const PREFIX_BOOST: Score = 3.0;

pub const HIGHLIGHT_PRE_TAG: &str = "<mark>";
pub const HIGHLIGHT_POST_TAG: &str = "</mark>";

lazy_static! {
    // Indexed by edit distance minus one
    static ref LEVENSHTEIN: [LevenshteinAutomatonBuilder; 2] = [
        LevenshteinAutomatonBuilder::new(1, true),
        LevenshteinAutomatonBuilder::new(2, true),
    ];
}

/// Edit distance allowed for a query token, scaled by its length
pub fn auto_fuzziness(token: &str) -> u8 {
    match token.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// A forum search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumQuery {
    /// Raw user input
    pub text: String,

    /// Number of hits to return
    pub limit: usize,

    /// Compute highlighted fragments
    pub highlight: bool,
}

impl ForumQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 50,
            highlight: true,
        }
    }

    /// Set limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Enable/disable highlighting
    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }
}

/// A ranked match read back from the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub mongo_id: String,
    pub score: Score,
    pub title_highlight: Option<String>,
    pub description_highlight: Option<String>,
}

/// Builds and runs forum queries against an open index
pub struct QueryEngine<'a> {
    index: &'a ForumIndex,
    fields: ForumFields,
    highlight_max_chars: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a ForumIndex, highlight_max_chars: usize) -> Self {
        Self {
            index,
            fields: index.fields(),
            highlight_max_chars,
        }
    }

    /// Run the query text through the title analyzer, keeping token positions
    pub fn analyze(&self, text: &str) -> SearchResult<Vec<(usize, String)>> {
        let mut analyzer = self.index.index().tokenizer_for_field(self.fields.title)?;
        let mut stream = analyzer.token_stream(text);

        let mut tokens = Vec::new();
        stream.process(&mut |token| {
            if !token.text.is_empty() {
                tokens.push((token.position, token.text.clone()));
            }
        });

        Ok(tokens)
    }

    /// Build the combined query, or `None` when nothing survives analysis
    pub fn build_query(&self, text: &str) -> SearchResult<Option<Box<dyn Query>>> {
        let tokens = self.analyze(text)?;
        Ok(self.query_for_tokens(&tokens))
    }

    fn query_for_tokens(&self, tokens: &[(usize, String)]) -> Option<Box<dyn Query>> {
        if tokens.is_empty() {
            return None;
        }

        let title_match: Box<dyn Query> = Box::new(BoostQuery::new(
            self.fuzzy_match(self.fields.title, tokens),
            TITLE_BOOST,
        ));
        let best_field = DisjunctionMaxQuery::new(vec![
            title_match,
            self.fuzzy_match(self.fields.description, tokens),
        ]);

        let title_prefix = PhrasePrefixQuery::new_with_offset(
            tokens
                .iter()
                .map(|(position, token)| {
                    (*position, Term::from_field_text(self.fields.title, token))
                })
                .collect(),
        );

        let prefix_match: Box<dyn Query> =
            Box::new(BoostQuery::new(Box::new(title_prefix), PREFIX_BOOST));
        let query = BooleanQuery::new(vec![
            (Occur::Should, Box::new(best_field) as Box<dyn Query>),
            (Occur::Should, prefix_match),
        ]);

        Some(Box::new(query))
    }

    // Exact terms carry relevance; fuzzy expansions only widen recall
    fn fuzzy_match(&self, field: Field, tokens: &[(usize, String)]) -> Box<dyn Query> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len() * 2);

        for (_, token) in tokens {
            let term = Term::from_field_text(field, token);
            clauses.push((
                Occur::Should,
                Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs)),
            ));

            let distance = auto_fuzziness(token);
            if distance > 0 {
                clauses.push((
                    Occur::Should,
                    Box::new(FuzzyTermQuery::new(term, distance, true)),
                ));
            }
        }

        Box::new(BooleanQuery::new(clauses))
    }

    /// Execute a query, best hit first
    pub fn execute(&self, query: &ForumQuery) -> SearchResult<Vec<SearchHit>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let tokens = self.analyze(&query.text)?;
        let Some(tantivy_query) = self.query_for_tokens(&tokens) else {
            return Ok(Vec::new());
        };

        let searcher = self.index.searcher();
        let top_docs = searcher.search(&*tantivy_query, &TopDocs::with_limit(query.limit))?;

        let generators = if query.highlight && !top_docs.is_empty() {
            Some((
                self.snippet_generator(&searcher, self.fields.title, &tokens, true)?,
                self.snippet_generator(&searcher, self.fields.description, &tokens, false)?,
            ))
        } else {
            None
        };

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;

            let Some(mongo_id) = doc
                .get_first(self.fields.mongo_id)
                .and_then(|v| v.as_str())
                .map(str::to_string)
            else {
                continue;
            };

            let (title_highlight, description_highlight) = match &generators {
                Some((title, description)) => (
                    render_highlight(&title.snippet_from_doc(&doc)),
                    render_highlight(&description.snippet_from_doc(&doc)),
                ),
                None => (None, None),
            };

            hits.push(SearchHit {
                mongo_id,
                score,
                title_highlight,
                description_highlight,
            });
        }

        Ok(hits)
    }

    fn snippet_generator(
        &self,
        searcher: &Searcher,
        field: Field,
        tokens: &[(usize, String)],
        prefix: bool,
    ) -> SearchResult<SnippetGenerator> {
        let clauses: Vec<(Occur, Box<dyn Query>)> = self
            .matched_terms(searcher, field, tokens, prefix)?
            .into_iter()
            .map(|text| {
                let term = Term::from_field_text(field, &text);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();

        let mut generator = SnippetGenerator::create(searcher, &BooleanQuery::new(clauses), field)?;
        generator.set_max_num_chars(self.highlight_max_chars);
        Ok(generator)
    }

    /// Index terms of `field` the query clauses can match: the tokens
    /// themselves, their fuzzy neighbours and, with `prefix`, completions of
    /// the last token.
    fn matched_terms(
        &self,
        searcher: &Searcher,
        field: Field,
        tokens: &[(usize, String)],
        prefix: bool,
    ) -> SearchResult<BTreeSet<String>> {
        let mut matched: BTreeSet<String> = tokens.iter().map(|(_, t)| t.clone()).collect();

        let automata: Vec<DFA> = tokens
            .iter()
            .filter_map(|(_, token)| match auto_fuzziness(token) {
                0 => None,
                distance => Some(LEVENSHTEIN[distance as usize - 1].build_dfa(token)),
            })
            .collect();
        let partial = if prefix {
            tokens.last().map(|(_, token)| token.as_str())
        } else {
            None
        };

        for segment in searcher.segment_readers() {
            let inverted = segment.inverted_index(field)?;
            let mut stream = inverted.terms().stream()?;

            while stream.advance() {
                let Ok(text) = std::str::from_utf8(stream.key()) else {
                    continue;
                };

                let fuzzy = automata
                    .iter()
                    .any(|dfa| matches!(dfa.eval(text), Distance::Exact(_)));
                let completes = partial.is_some_and(|p| text.starts_with(p));

                if fuzzy || completes {
                    matched.insert(text.to_string());
                }
            }
        }

        Ok(matched)
    }
}

fn render_highlight(snippet: &Snippet) -> Option<String> {
    if snippet.highlighted().is_empty() {
        return None;
    }
    Some(mark_ranges(snippet.fragment(), snippet.highlighted()))
}

/// Wrap each byte range of `fragment` in highlight tags
pub fn mark_ranges(fragment: &str, ranges: &[Range<usize>]) -> String {
    let mut marked = String::with_capacity(
        fragment.len() + ranges.len() * (HIGHLIGHT_PRE_TAG.len() + HIGHLIGHT_POST_TAG.len()),
    );
    let mut cursor = 0;

    for range in ranges {
        if range.start < cursor {
            continue;
        }
        let (Some(before), Some(matched)) = (
            fragment.get(cursor..range.start),
            fragment.get(range.clone()),
        ) else {
            continue;
        };

        marked.push_str(before);
        marked.push_str(HIGHLIGHT_PRE_TAG);
        marked.push_str(matched);
        marked.push_str(HIGHLIGHT_POST_TAG);
        cursor = range.end;
    }

    marked.push_str(fragment.get(cursor..).unwrap_or_default());
    marked
}

//! Interactive browser over an error file.

use std::io::{BufRead, Write};

use super::display::{format_g, render_case};
use crate::error::Result;
use crate::eval::{ErrorCase, MatchMode, WorkerContext};
use crate::search::Bm25Ranker;

pub const USAGE: &str = "\
Interactive Error Analyzer
>> usage               show this help
>> c <case_id>         show case (0-based) with its candidate documents
>> content <doc_id>    print a document's full text
>> check <case_id>     re-run answer matching on each candidate of a case
>> search <question>   rank documents for a free-text question
>> quit                leave";

/// Error-file REPL: look at cases and open candidate documents.
///
/// Document access and ranking are optional; commands that need them say so
/// instead of failing when the database is unavailable.
pub struct Explorer {
    cases: Vec<ErrorCase>,
    docs: Option<WorkerContext>,
    ranker: Option<Bm25Ranker>,
    mode: MatchMode,
    n_docs: usize,
    color: bool,
}

impl Explorer {
    pub fn new(cases: Vec<ErrorCase>, color: bool) -> Self {
        Self {
            cases,
            docs: None,
            ranker: None,
            mode: MatchMode::default(),
            n_docs: 5,
            color,
        }
    }

    /// Document lookups and answer matching for `content` and `check`.
    pub fn with_documents(mut self, docs: WorkerContext, mode: MatchMode) -> Self {
        self.docs = Some(docs);
        self.mode = mode;
        self
    }

    /// Ranker and candidate count for `search`.
    pub fn with_ranker(mut self, ranker: Bm25Ranker, n_docs: usize) -> Self {
        self.ranker = Some(ranker);
        self.n_docs = n_docs;
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Run one command line. Returns `false` when the session should end.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "quit" | "exit" | "q" => return Ok(false),
            "usage" | "help" => writeln!(out, "{}", USAGE)?,
            "c" | "case" => self.show_case(arg, out)?,
            "content" => self.show_content(arg, out)?,
            "check" => self.check_case(arg, out)?,
            "search" => self.search(arg, out)?,
            other => writeln!(out, "unknown command '{}', try `usage`", other)?,
        }
        Ok(true)
    }

    fn case_arg<W: Write>(&self, arg: &str, out: &mut W) -> Result<Option<usize>> {
        let Ok(case_id) = arg.parse::<usize>() else {
            writeln!(out, "case_id should be an integer")?;
            return Ok(None);
        };
        if case_id < self.cases.len() {
            return Ok(Some(case_id));
        }
        if self.cases.is_empty() {
            writeln!(out, "no cases loaded")?;
        } else {
            writeln!(out, "case id should be in range [0, {}]", self.cases.len() - 1)?;
        }
        Ok(None)
    }

    fn show_case<W: Write>(&self, arg: &str, out: &mut W) -> Result<()> {
        if let Some(case_id) = self.case_arg(arg, out)? {
            write!(out, "{}", render_case(&self.cases[case_id], self.color))?;
        }
        Ok(())
    }

    fn show_content<W: Write>(&self, doc_id: &str, out: &mut W) -> Result<()> {
        if doc_id.is_empty() {
            writeln!(out, "usage: content <doc_id>")?;
            return Ok(());
        }
        let Some(docs) = self.docs.as_ref() else {
            writeln!(out, "no document database configured (--doc-db)")?;
            return Ok(());
        };
        match docs.doc_text(doc_id) {
            Ok(text) => writeln!(out, "Content for title `{}`:\n{}", doc_id, text)?,
            Err(e) => writeln!(out, "{}", e)?,
        }
        Ok(())
    }

    /// One line per candidate: whether it contains an answer under the
    /// current match mode.
    fn check_case<W: Write>(&mut self, arg: &str, out: &mut W) -> Result<()> {
        let Some(case_id) = self.case_arg(arg, out)? else {
            return Ok(());
        };
        let Some(docs) = self.docs.as_mut() else {
            writeln!(out, "no document database configured (--doc-db)")?;
            return Ok(());
        };
        let case = &self.cases[case_id];
        writeln!(out, "Matching {} ({} mode):", serde_json::to_string(&case.answer)?, self.mode)?;
        let mut hits = 0;
        for (rank, (doc_id, _)) in case.candidates.iter().enumerate() {
            let verdict = match docs.has_answer(&case.answer, doc_id, self.mode) {
                Ok(true) => {
                    hits += 1;
                    "hit".to_string()
                }
                Ok(false) => "miss".to_string(),
                Err(e) => format!("error: {}", e),
            };
            writeln!(out, "{:>4}  {:<40} {}", rank + 1, doc_id, verdict)?;
        }
        writeln!(out, "{} of {} candidates contain an answer", hits, case.candidates.len())?;
        Ok(())
    }

    fn search<W: Write>(&self, query: &str, out: &mut W) -> Result<()> {
        if query.is_empty() {
            writeln!(out, "usage: search <question>")?;
            return Ok(());
        }
        let Some(ranker) = self.ranker.as_ref() else {
            writeln!(out, "no document database configured (--doc-db)")?;
            return Ok(());
        };
        let ranked = ranker.closest_docs(query, self.n_docs)?;
        if ranked.is_empty() {
            writeln!(out, "no documents found")?;
            return Ok(());
        }
        writeln!(out, "{:>4}  {:<40} {:>10}", "Rank", "Doc Id", "Doc Score")?;
        writeln!(out, "{:-<56}", "")?;
        for (rank, (doc_id, score)) in ranked.into_pairs().into_iter().enumerate() {
            writeln!(out, "{:>4}  {:<40} {:>10}", rank + 1, doc_id, format_g(score, 5))?;
        }
        Ok(())
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "{}", USAGE)?;
        write!(out, ">> ")?;
        out.flush()?;
        for line in input.lines() {
            if !self.execute(&line?, out)? {
                break;
            }
            write!(out, ">> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }
}

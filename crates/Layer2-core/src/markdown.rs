//! Markdown code chunks
//!
//! pulldown-cmark 이벤트에서 코드 블록만 뽑아 문서 순서대로 넘겨준다.
//! Records are produced lazily, one per code block.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Declared language of a code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    /// Python - collected into the container payload
    Interpreter,
    /// SQL - sent to the query executor
    Declarative,
    /// Anything else (kept for diagnostics)
    Other(String),
}

impl Language {
    /// Classify a fence info string (`python`, `sql title="x"`, ...)
    pub fn from_info(info: &str) -> Self {
        let tag = info
            .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        match tag.as_str() {
            "python" | "py" | "python3" => Language::Interpreter,
            "sql" => Language::Declarative,
            _ => Language::Other(tag),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::Interpreter => "python",
            Language::Declarative => "sql",
            Language::Other(tag) => tag,
        }
    }
}

/// One code block, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub language: Language,
    pub body: String,
}

impl CodeRecord {
    pub fn new(language: Language, body: impl Into<String>) -> Self {
        Self {
            language,
            body: body.into(),
        }
    }
}

/// Lazy iterator over the code blocks of a markdown document
pub struct CodeChunks<'a> {
    parser: Parser<'a>,
}

impl<'a> CodeChunks<'a> {
    pub fn new(markdown: &'a str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        Self {
            parser: Parser::new_ext(markdown, options),
        }
    }
}

impl Iterator for CodeChunks<'_> {
    type Item = CodeRecord;

    fn next(&mut self) -> Option<CodeRecord> {
        let mut current: Option<(Language, String)> = None;

        for event in self.parser.by_ref() {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => Language::from_info(&info),
                        CodeBlockKind::Indented => Language::Other(String::new()),
                    };
                    current = Some((language, String::new()));
                }
                Event::Text(text) => {
                    if let Some((_, body)) = current.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((language, body)) = current.take() {
                        let body = body.trim_end_matches(['\n', '\r']);
                        return Some(CodeRecord::new(language, body));
                    }
                }
                _ => {}
            }
        }

        None
    }
}

/// 문서의 코드 블록 이터레이터
pub fn iterate_code_chunks(markdown: &str) -> CodeChunks<'_> {
    CodeChunks::new(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_python_block() {
        let records: Vec<_> = iterate_code_chunks("```python\nprint('hi')\n```").collect();
        assert_eq!(
            records,
            vec![CodeRecord::new(Language::Interpreter, "print('hi')")]
        );
    }

    #[test]
    fn test_document_order_and_languages() {
        let markdown = "# Title\n\n```sql\nSELECT 1\n```\n\ntext\n\n```python\na=1\n```\n\n```bash\nls\n```\n";
        let records: Vec<_> = iterate_code_chunks(markdown).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].language, Language::Declarative);
        assert_eq!(records[0].body, "SELECT 1");
        assert_eq!(records[1].language, Language::Interpreter);
        assert_eq!(records[2].language, Language::Other("bash".to_string()));
    }

    #[test]
    fn test_multiline_body_kept() {
        let markdown = "```python\nfor i in range(3):\n    print(i)\n```";
        let record = iterate_code_chunks(markdown).next().unwrap();
        assert_eq!(record.body, "for i in range(3):\n    print(i)");
    }

    #[test]
    fn test_info_string_variants() {
        assert_eq!(Language::from_info("Python"), Language::Interpreter);
        assert_eq!(Language::from_info("py title=\"x\""), Language::Interpreter);
        assert_eq!(Language::from_info("sql,linenos"), Language::Declarative);
        assert_eq!(Language::from_info(""), Language::Other(String::new()));
    }

    #[test]
    fn test_indented_block_is_other() {
        let markdown = "para\n\n    print('indented')\n";
        let records: Vec<_> = iterate_code_chunks(markdown).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].language, Language::Other(String::new()));
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let records: Vec<_> = iterate_code_chunks("```python\nx = 1\n").collect();
        assert_eq!(records, vec![CodeRecord::new(Language::Interpreter, "x = 1")]);
    }

    #[test]
    fn test_no_code_blocks() {
        assert_eq!(iterate_code_chunks("just *text*").count(), 0);
        assert_eq!(iterate_code_chunks("").count(), 0);
    }
}

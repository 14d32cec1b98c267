//! Line-oriented edits on Markdown note bodies. Documents are split and
//! rejoined on `\n`; only heading markers and `---` lines are inspected.

/// Opening and closing line of a metadata block.
pub const SENTINEL: &str = "---";

/// Returned by [`read_frontmatter_raw`] when a note has no metadata block.
pub const NO_FRONTMATTER: &str = "No frontmatter found.";

fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_sentinel(line: &str) -> bool {
    line.trim() == SENTINEL
}

/// Index of the closing sentinel line, if the document opens a metadata block
/// and terminates it.
fn metadata_end(lines: &[&str]) -> Option<usize> {
    if !is_sentinel(lines.first()?) {
        return None;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| is_sentinel(line))
        .map(|(idx, _)| idx)
}

/// Insert `content` at the end of the first section whose heading contains
/// `heading`, or create a level-2 heading for it at the end of the document.
///
/// Matching is by substring on the heading line, so `"Task"` matches
/// `"## Tasks"` and callers may include or omit the `#` markers.
pub fn append_under_heading(document: &str, heading: &str, content: &str) -> String {
    let lines: Vec<&str> = document.split('\n').collect();

    let matched = lines
        .iter()
        .position(|line| is_heading(line) && line.contains(heading));

    // The new heading keeps the caller's text verbatim so the next call matches it.
    let Some(start) = matched else {
        if document.is_empty() {
            return format!("## {}\n{}", heading, content);
        }
        return format!("{}\n\n## {}\n{}", document, heading, content);
    };

    let insert_at = lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, line)| is_heading(line))
        .map(|(idx, _)| idx)
        .unwrap_or(lines.len());

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 3);
    out.extend_from_slice(&lines[..insert_at]);
    out.extend(["", content, ""]);
    out.extend_from_slice(&lines[insert_at..]);
    out.join("\n")
}

/// The metadata block including both sentinel lines, or `None` when the
/// document has no terminated block at its top.
pub fn read_metadata_block(document: &str) -> Option<String> {
    let lines: Vec<&str> = document.split('\n').collect();
    let end = metadata_end(&lines)?;
    Some(lines[..=end].join("\n"))
}

/// Collapse multi-line text onto one line so it cannot open or close a block.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Set `key` to `value` in the metadata block, creating the block if needed.
///
/// Replaces the first existing `key:` line in place, or appends the pair just
/// before the closing sentinel. Lines outside the block are left untouched.
/// Line breaks inside `key` or `value` are folded into spaces.
pub fn upsert_metadata_key(document: &str, key: &str, value: &str) -> String {
    let key = single_line(key);
    let entry = format!("{}: {}", key, single_line(value));
    let lines: Vec<&str> = document.split('\n').collect();

    let Some(end) = metadata_end(&lines) else {
        return format!("{}\n{}\n{}\n{}", SENTINEL, entry, SENTINEL, document);
    };

    let prefix = format!("{}:", key);
    let existing = lines[1..end]
        .iter()
        .position(|line| line.trim().starts_with(&prefix))
        .map(|idx| idx + 1);

    let mut out = lines;
    match existing {
        Some(idx) => out[idx] = entry.as_str(),
        None => out.insert(end, entry.as_str()),
    }
    out.join("\n")
}

/// The raw metadata block, or [`NO_FRONTMATTER`] when there is none.
///
/// An empty block (`---\n---`) is returned as-is so callers can tell it apart
/// from a missing one.
pub fn read_frontmatter_raw(document: &str) -> String {
    read_metadata_block(document).unwrap_or_else(|| NO_FRONTMATTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_blank(doc: &str) -> Vec<&str> {
        doc.split('\n').filter(|l| !l.trim().is_empty()).collect()
    }

    #[test]
    fn test_append_under_existing_heading() {
        let doc = "# Title\n## Tasks\n- a\n## Notes\nfoo";
        assert_eq!(
            append_under_heading(doc, "Tasks", "- b"),
            "# Title\n## Tasks\n- a\n\n- b\n\n## Notes\nfoo"
        );
    }

    #[test]
    fn test_append_creates_missing_heading() {
        assert_eq!(
            append_under_heading("# Title\nbody", "Tasks", "- b"),
            "# Title\nbody\n\n## Tasks\n- b"
        );
    }

    #[test]
    fn test_append_to_last_section_goes_to_end() {
        let doc = "# Title\n## Tasks\n- a";
        assert_eq!(
            append_under_heading(doc, "Tasks", "- b"),
            "# Title\n## Tasks\n- a\n\n- b\n"
        );
    }

    #[test]
    fn test_append_matches_by_substring() {
        let doc = "## Tasks\n- a\n## Other";
        let out = append_under_heading(doc, "Task", "- b");
        assert_eq!(out, "## Tasks\n- a\n\n- b\n\n## Other");
        assert_eq!(out.matches("## Tasks").count(), 1);
    }

    #[test]
    fn test_append_stops_at_deeper_heading() {
        let doc = "## Tasks\n- a\n### Sub\n- c";
        assert_eq!(
            append_under_heading(doc, "Tasks", "- b"),
            "## Tasks\n- a\n\n- b\n\n### Sub\n- c"
        );
    }

    #[test]
    fn test_append_ignores_non_heading_mentions() {
        let doc = "Tasks are listed below\n## Tasks\n- a";
        assert_eq!(
            append_under_heading(doc, "Tasks", "- b"),
            "Tasks are listed below\n## Tasks\n- a\n\n- b\n"
        );
    }

    #[test]
    fn test_append_uses_first_match_only() {
        let doc = "## Tasks\n- a\n## Tasks\n- z";
        assert_eq!(
            append_under_heading(doc, "Tasks", "- b"),
            "## Tasks\n- a\n\n- b\n\n## Tasks\n- z"
        );
    }

    #[test]
    fn test_append_new_heading_keeps_caller_text() {
        assert_eq!(
            append_under_heading("body", "### Log", "entry"),
            "body\n\n## ### Log\nentry"
        );
    }

    #[test]
    fn test_repeated_append_reuses_created_heading() {
        for heading in ["### Log", " Tasks ", "Tasks", "#"] {
            let once = append_under_heading("body", heading, "a");
            let twice = append_under_heading(&once, heading, "b");
            let headings = twice.split('\n').filter(|l| l.starts_with('#')).count();
            assert_eq!(headings, 1, "duplicated {:?}: {:?}", heading, twice);
            assert!(twice.ends_with("a\n\nb\n"), "{:?}", twice);
        }
    }

    #[test]
    fn test_append_to_empty_document() {
        assert_eq!(append_under_heading("", "Tasks", "- b"), "## Tasks\n- b");
    }

    #[test]
    fn test_append_preserves_existing_lines() {
        let doc = "---\ntags: x\n---\n# T\n## A\none\n\ntwo\n## B\nthree";
        for heading in ["A", "B", "Missing"] {
            let out = append_under_heading(doc, heading, "new line");
            let out_lines = non_blank(&out);
            for line in non_blank(doc) {
                assert!(out_lines.contains(&line), "lost {:?} for {}", line, heading);
            }
            let added = out_lines.len() - non_blank(doc).len();
            let expected = if heading == "Missing" { 2 } else { 1 };
            assert_eq!(added, expected);
            assert!(out_lines.contains(&"new line"));
        }
    }

    #[test]
    fn test_read_metadata_block() {
        let doc = "---\ntitle: x\ntags: [a]\n---\nbody\n---\nmore";
        assert_eq!(
            read_metadata_block(doc).as_deref(),
            Some("---\ntitle: x\ntags: [a]\n---")
        );
    }

    #[test]
    fn test_read_metadata_block_absent() {
        assert!(read_metadata_block("# Just a heading\n---\n").is_none());
        assert!(read_metadata_block("").is_none());
    }

    #[test]
    fn test_unterminated_block_is_absent() {
        assert!(read_metadata_block("---\ntitle: x\nbody").is_none());
    }

    #[test]
    fn test_read_frontmatter_raw_distinguishes_empty() {
        assert_eq!(read_frontmatter_raw("---\n---\nbody"), "---\n---");
        assert_eq!(read_frontmatter_raw("body"), NO_FRONTMATTER);
    }

    #[test]
    fn test_upsert_replaces_existing_key() {
        assert_eq!(
            upsert_metadata_key("---\nstatus: draft\n---\nbody", "status", "done"),
            "---\nstatus: done\n---\nbody"
        );
    }

    #[test]
    fn test_upsert_creates_block() {
        assert_eq!(
            upsert_metadata_key("body only", "tag", "x"),
            "---\ntag: x\n---\nbody only"
        );
    }

    #[test]
    fn test_upsert_appends_new_key_before_closing() {
        assert_eq!(
            upsert_metadata_key("---\ntitle: T\n---\nbody", "status", "done"),
            "---\ntitle: T\nstatus: done\n---\nbody"
        );
    }

    #[test]
    fn test_upsert_does_not_match_key_prefix() {
        assert_eq!(
            upsert_metadata_key("---\ntags: a\n---\n", "tag", "b"),
            "---\ntags: a\ntag: b\n---\n"
        );
    }

    #[test]
    fn test_upsert_replaces_only_first_duplicate() {
        assert_eq!(
            upsert_metadata_key("---\nk: 1\nk: 2\n---", "k", "3"),
            "---\nk: 3\nk: 2\n---"
        );
    }

    #[test]
    fn test_upsert_leaves_body_untouched() {
        let doc = "---\nk: 1\n---\nk: body line\n---\n";
        assert_eq!(
            upsert_metadata_key(doc, "k", "2"),
            "---\nk: 2\n---\nk: body line\n---\n"
        );
    }

    #[test]
    fn test_upsert_on_malformed_header_prepends_block() {
        let doc = "---\ntitle: x\nno closing";
        let out = upsert_metadata_key(doc, "k", "v");
        assert_eq!(out, "---\nk: v\n---\n---\ntitle: x\nno closing");
        assert_eq!(read_metadata_block(&out).as_deref(), Some("---\nk: v\n---"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let docs = [
            "",
            "body only",
            "---\nstatus: draft\n---\nbody",
            "---\n---\n",
            "---\nunterminated",
            "---\nk: 1\nk: 2\n---\n# H",
            "  ---  \nk: 1\n---",
        ];
        for doc in docs {
            let pairs = [
                ("k", "v"),
                ("status", "done"),
                ("empty", ""),
                ("k", "a\n---\nb"),
            ];
            for (key, value) in pairs {
                let once = upsert_metadata_key(doc, key, value);
                let twice = upsert_metadata_key(&once, key, value);
                assert_eq!(once, twice, "not idempotent for {:?} {}", doc, key);
            }
        }
    }

    #[test]
    fn test_upsert_yields_single_block() {
        for doc in ["", "body", "---\nx: 1\n---\n---\n", "---\nopen"] {
            for (key, value) in [("k", "v"), ("k", "x\n---"), ("a\n---", "---")] {
                let out = upsert_metadata_key(doc, key, value);
                let block = read_metadata_block(&out).unwrap();
                let sentinels = block.split('\n').filter(|l| l.trim() == SENTINEL).count();
                assert_eq!(sentinels, 2, "block {:?}", block);
            }
        }
    }

    #[test]
    fn test_upsert_folds_multiline_value() {
        let once = upsert_metadata_key("body", "k", "x\n---");
        assert_eq!(once, "---\nk: x ---\n---\nbody");
        assert_eq!(upsert_metadata_key(&once, "k", "x\n---"), once);

        let doc = "---\nk: 1\n---\nbody";
        assert_eq!(
            upsert_metadata_key(doc, "k", "line one\r\nline two\n"),
            "---\nk: line one line two\n---\nbody"
        );
    }

    #[test]
    fn test_upserted_block_is_valid_yaml() {
        let doc = upsert_metadata_key("---\ntitle: \"Note\"\n---\nbody", "status", "done");
        let block = read_metadata_block(&doc).unwrap();
        let inner = block
            .strip_prefix("---\n")
            .and_then(|b| b.strip_suffix("---"))
            .unwrap();
        let parsed: serde_yaml::Mapping = serde_yaml::from_str(inner).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed.get("status").and_then(|v| v.as_str()),
            Some("done")
        );
    }
}

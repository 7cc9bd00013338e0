//! `git fast-import` stream encoding.
//!
//! One publish is one commit on the hosting branch. The commit replaces the
//! branch's tree (or only the prefix subtree) with the scanned files:
//!
//! ```text
//! feature done
//! commit refs/heads/gh-pages
//! committer Name <email> 1700000000 +0200
//! data 21
//! Update documentation
//! from 4b825dc642cb6eb9a060e54bf8d69288fbee4904
//! deleteall
//! M 100644 inline index.html
//! data 7
//! <html/>
//! done
//! ```
//!
//! `feature done` makes fast-import reject a stream cut short, so a failed
//! encode never updates the branch.

use super::{Identity, PublishError, SourceFile};
use gix::{ObjectId, date::Time};
use std::{
    borrow::Cow,
    fs,
    io::{self, Write},
};

/// Marker file that turns off Jekyll processing on GitHub Pages.
pub const NOJEKYLL: &str = ".nojekyll";

/// Custom domain file read by GitHub Pages.
pub const CNAME: &str = "CNAME";

/// Everything needed to encode a publish commit.
#[derive(Debug, Clone)]
pub struct CommitPlan<'a> {
    pub branch: &'a str,
    pub committer: &'a Identity,
    /// Commit time with the committer's UTC offset.
    pub time: Time,
    pub message: &'a str,
    pub parent: Option<ObjectId>,
    pub prefix: Option<&'a str>,
    pub files: &'a [SourceFile],
    pub nojekyll: bool,
    pub cname: Option<&'a str>,
}

/// Encode `plan` as a fast-import stream into `out`.
///
/// Files are read from disk one at a time. Failing to read one is
/// [`PublishError::Io`]; failing to write is [`PublishError::Stream`].
pub fn encode<W: Write>(plan: &CommitPlan<'_>, out: W) -> Result<(), PublishError> {
    let mut out = StreamWriter { out };

    out.line("feature done")?;
    out.line(&format!("commit {}", super::branch_ref(plan.branch)))?;
    out.line(&format!(
        "committer {} {}",
        plan.committer.signature(),
        raw_time(plan.time)
    ))?;

    let message = if plan.message.ends_with('\n') {
        Cow::Borrowed(plan.message)
    } else {
        Cow::Owned(format!("{}\n", plan.message))
    };
    out.data(message.as_bytes())?;

    if let Some(parent) = &plan.parent {
        out.line(&format!("from {parent}"))?;
    }

    match plan.prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        // Only the prefix subtree is replaced; nothing to delete on a fresh branch
        Some(prefix) => {
            if plan.parent.is_some() {
                out.line(&format!("D {}", quote_path(prefix)))?;
            }
        }
        None => out.line("deleteall")?,
    }

    for file in plan.files {
        let contents =
            fs::read(&file.source).map_err(|e| PublishError::Io(file.source.clone(), e))?;
        out.file(&file.path, file.mode.as_str(), &contents)?;
    }

    if plan.nojekyll {
        out.file(NOJEKYLL, "100644", b"")?;
    }
    if let Some(cname) = plan.cname {
        out.file(CNAME, "100644", format!("{cname}\n").as_bytes())?;
    }

    out.line("done")
}

/// `<seconds> <+|-><hhmm>`, the `raw` date format.
fn raw_time(time: Time) -> String {
    let sign = if time.offset < 0 { '-' } else { '+' };
    let offset = time.offset.unsigned_abs();
    format!(
        "{} {sign}{:02}{:02}",
        time.seconds,
        offset / 3600,
        offset % 3600 / 60
    )
}

/// Quote a path for fast-import if it would otherwise be misread.
pub fn quote_path(path: &str) -> Cow<'_, str> {
    let needs_quoting =
        path.starts_with('"') || path.contains(['\n', '"', '\\']);
    if !needs_quoting {
        return Cow::Borrowed(path);
    }

    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for c in path.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

struct StreamWriter<W> {
    out: W,
}

impl<W: Write> StreamWriter<W> {
    fn line(&mut self, line: &str) -> Result<(), PublishError> {
        self.write(line.as_bytes())?;
        self.write(b"\n")
    }

    /// Exact-length `data` block.
    fn data(&mut self, bytes: &[u8]) -> Result<(), PublishError> {
        self.line(&format!("data {}", bytes.len()))?;
        self.write(bytes)?;
        self.write(b"\n")
    }

    fn file(&mut self, path: &str, mode: &str, contents: &[u8]) -> Result<(), PublishError> {
        self.line(&format!("M {mode} inline {}", quote_path(path)))?;
        self.data(contents)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PublishError> {
        self.out.write_all(bytes).map_err(PublishError::Stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::scan::FileMode;
    use std::path::Path;
    use tempfile::TempDir;

    fn identity() -> Identity {
        Identity::new("Docs Bot", "docs@example.com")
    }

    fn plan<'a>(identity: &'a Identity, files: &'a [SourceFile]) -> CommitPlan<'a> {
        CommitPlan {
            branch: "gh-pages",
            committer: identity,
            time: Time::new(1_700_000_000, 0),
            message: "Update documentation",
            parent: None,
            prefix: None,
            files,
            nojekyll: false,
            cname: None,
        }
    }

    fn source(dir: &Path, path: &str, contents: &str) -> SourceFile {
        let on_disk = dir.join(path.replace('/', "_"));
        fs::write(&on_disk, contents).unwrap();
        SourceFile {
            path: path.to_owned(),
            source: on_disk,
            mode: FileMode::Regular,
        }
    }

    fn encode_bytes(plan: &CommitPlan<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        encode(plan, &mut out).unwrap();
        out
    }

    fn encode_str(plan: &CommitPlan<'_>) -> String {
        String::from_utf8(encode_bytes(plan)).unwrap()
    }

    #[test]
    fn test_encode_fresh_branch() {
        let dir = TempDir::new().unwrap();
        let files = [source(dir.path(), "index.html", "<html/>")];
        let id = identity();

        let stream = encode_str(&plan(&id, &files));
        assert_eq!(
            stream,
            "feature done\n\
             commit refs/heads/gh-pages\n\
             committer Docs Bot <docs@example.com> 1700000000 +0000\n\
             data 21\n\
             Update documentation\n\n\
             deleteall\n\
             M 100644 inline index.html\n\
             data 7\n\
             <html/>\n\
             done\n"
        );
    }

    #[test]
    fn test_encode_with_parent() {
        let id = identity();
        let parent = ObjectId::from_hex(b"4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap();
        let mut p = plan(&id, &[]);
        p.parent = Some(parent);

        let stream = encode_str(&p);
        assert!(stream.contains("\nfrom 4b825dc642cb6eb9a060e54bf8d69288fbee4904\ndeleteall\n"));
    }

    #[test]
    fn test_encode_without_parent_has_no_from() {
        let id = identity();
        let stream = encode_str(&plan(&id, &[]));
        assert!(!stream.contains("\nfrom "));
    }

    #[test]
    fn test_encode_prefix_replaces_subtree_only() {
        let id = identity();
        let parent = ObjectId::null(gix::hash::Kind::Sha1);
        let mut p = plan(&id, &[]);
        p.prefix = Some("v2/");

        // fresh branch: nothing to delete
        let stream = encode_str(&p);
        assert!(!stream.contains("deleteall"));
        assert!(!stream.contains("\nD "));

        p.parent = Some(parent);
        let stream = encode_str(&p);
        assert!(stream.contains("\nD v2\n"));
        assert!(!stream.contains("deleteall"));
    }

    #[test]
    fn test_encode_nojekyll_and_cname() {
        let id = identity();
        let mut p = plan(&id, &[]);
        p.nojekyll = true;
        p.cname = Some("docs.example.com");

        let stream = encode_str(&p);
        assert!(stream.contains("M 100644 inline .nojekyll\ndata 0\n\n"));
        assert!(stream.contains("M 100644 inline CNAME\ndata 17\ndocs.example.com\n\n"));
    }

    #[test]
    fn test_encode_message_keeps_trailing_newline() {
        let id = identity();
        let mut p = plan(&id, &[]);
        p.message = "Deploy\n";
        assert!(encode_str(&p).contains("data 7\nDeploy\n\n"));
    }

    #[test]
    fn test_encode_binary_length() {
        let dir = TempDir::new().unwrap();
        let on_disk = dir.path().join("logo.png");
        fs::write(&on_disk, [0x89, b'P', b'N', b'G', 0, 0xff]).unwrap();
        let files = [SourceFile {
            path: "_static/logo.png".into(),
            source: on_disk,
            mode: FileMode::Regular,
        }];
        let id = identity();

        let stream = encode_bytes(&plan(&id, &files));
        let marker = b"M 100644 inline _static/logo.png\ndata 6\n";
        let at = stream
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap();
        assert_eq!(&stream[at + marker.len()..at + marker.len() + 6], &[0x89, b'P', b'N', b'G', 0, 0xff]);
    }

    #[test]
    fn test_encode_missing_source() {
        let id = identity();
        let files = [SourceFile {
            path: "gone.html".into(),
            source: "/nonexistent/ghp-publish/gone.html".into(),
            mode: FileMode::Regular,
        }];
        let mut out = Vec::new();
        let err = encode(&plan(&id, &files), &mut out).unwrap_err();
        assert!(matches!(err, PublishError::Io(..)));
        // the stream stops short of `done`, so fast-import would reject it
        assert!(!String::from_utf8(out).unwrap().ends_with("done\n"));
    }

    #[test]
    fn test_encode_write_failure() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let id = identity();
        let err = encode(&plan(&id, &[]), Closed).unwrap_err();
        assert!(matches!(err, PublishError::Stream(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_raw_time_offsets() {
        assert_eq!(raw_time(Time::new(1_700_000_000, 0)), "1700000000 +0000");
        assert_eq!(raw_time(Time::new(1_700_000_000, 2 * 3600)), "1700000000 +0200");
        assert_eq!(raw_time(Time::new(1_700_000_000, -(5 * 3600 + 30 * 60))), "1700000000 -0530");
    }

    #[test]
    fn test_encode_committer_keeps_offset() {
        let id = identity();
        let mut p = plan(&id, &[]);
        p.time = Time::new(1_700_000_000, 3600);
        assert!(encode_str(&p).contains("\ncommitter Docs Bot <docs@example.com> 1700000000 +0100\n"));
    }

    #[test]
    fn test_quote_path() {
        assert_eq!(quote_path("plain/path with space.html"), "plain/path with space.html");
        assert_eq!(quote_path("\"quoted\""), "\"\\\"quoted\\\"\"");
        assert_eq!(quote_path("a\nb"), "\"a\\nb\"");
        assert_eq!(quote_path("back\\slash"), "\"back\\\\slash\"");
    }
}

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::batch::MissQueue;
use super::cache::SentimentCache;
use crate::catalog::{CategoryFiles, CommentMap, save_comments};

/// Counts from scanning comment files for cache misses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Comment files that exist and parsed.
    pub files_found: usize,
    /// Comment files that exist but could not be read.
    pub files_failed: usize,
    /// Non-blank comments seen.
    pub comments: usize,
}

/// Counts from writing cached annotations back into comment files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub files_scanned: usize,
    /// Files rewritten because at least one comment changed.
    pub files_updated: usize,
    pub files_failed: usize,
    /// Comments that now carry a cached annotation.
    pub comments_annotated: usize,
    /// Comments left with null sentiment (blank or uncached).
    pub comments_cleared: usize,
    /// Files that were rewritten.
    pub written: Vec<PathBuf>,
}

/// Reads every comment file and queues texts missing from the cache.
pub fn collect_misses(files: &[CategoryFiles], cache: &SentimentCache) -> (MissQueue, ScanReport) {
    let mut queue = MissQueue::new();
    let mut report = ScanReport::default();

    for file in files {
        let Some(comments) = load_or_skip(file, &mut report.files_failed) else {
            continue;
        };
        report.files_found += 1;

        for comment in comments.comments() {
            if let Some(text) = comment.body() {
                report.comments += 1;
                queue.enqueue_miss(text, cache);
            }
        }
    }

    info!(
        files = report.files_found,
        comments = report.comments,
        misses = queue.len(),
        "Scanned comment files for cache misses"
    );

    (queue, report)
}

/// Re-applies cached annotations to every comment file.
///
/// Blank or uncached comments get explicit nulls. A file is rewritten, atomically,
/// only when at least one comment's annotation changed.
pub fn enrich_comment_files(files: &[CategoryFiles], cache: &SentimentCache) -> EnrichReport {
    let mut report = EnrichReport::default();

    for file in files {
        let Some(mut comments) = load_or_skip(file, &mut report.files_failed) else {
            continue;
        };
        report.files_scanned += 1;

        let mut changed = false;
        for comment in comments.comments_mut() {
            let sentiment = comment.body().and_then(|text| cache.lookup(text));
            match sentiment {
                Some(_) => report.comments_annotated += 1,
                None => report.comments_cleared += 1,
            }
            changed |= comment.set_sentiment(sentiment);
        }

        if !changed {
            debug!(file = %file.label(), "Comment annotations unchanged");
            continue;
        }

        match save_comments(&file.comments, &comments) {
            Ok(()) => {
                info!(file = %file.label(), path = %file.comments.display(), "Comments enriched");
                report.files_updated += 1;
                report.written.push(file.comments.clone());
            }
            Err(e) => {
                warn!(file = %file.label(), error = %e, "Failed to write enriched comments");
                report.files_failed += 1;
            }
        }
    }

    report
}

fn load_or_skip(file: &CategoryFiles, failed: &mut usize) -> Option<CommentMap> {
    match file.load_comments() {
        Ok(comments) => Some(comments),
        Err(e) if e.is_not_found() => {
            debug!(file = %file.label(), "No comment file, skipping");
            None
        }
        Err(e) => {
            warn!(file = %file.label(), error = %e, "Unreadable comment file, skipping");
            *failed += 1;
            None
        }
    }
}

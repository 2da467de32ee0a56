//! Session lifecycle: ingest, ask, replace, history.

mod common;

use std::sync::Arc;

use pdfqa::session::Session;
use pdfqa::QaError;
use pdfqa_core::embedding::HashEmbedder;
use pdfqa_core::models::Page;
use pdfqa_core::retrieve::Retriever;
use tempfile::TempDir;

fn session() -> Session {
    Session::new(Arc::new(HashEmbedder::new(256)), Retriever::default(), 4)
}

fn story() -> Vec<Page> {
    vec![
        Page::new(
            0,
            "The character left because the village was destroyed. He walked for days.",
        ),
        Page::new(1, "The weather was sunny that day. Birds sang in the trees."),
    ]
}

#[tokio::test]
async fn ask_why_uses_causal_source() {
    let s = session();
    let summary = s.ingest_pages("story.pdf", story()).await.unwrap();
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.chunk_count, 2);

    let answer = s
        .ask("Why did the character leave?", "default")
        .await
        .unwrap();
    assert!(answer.answer.contains("village was destroyed"), "{}", answer.answer);
    assert_eq!(answer.sources.len(), 2);
    assert!(answer.prompt.contains("Why did the character leave?"));

    let history = s.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "Why did the character leave?");
    assert_eq!(history[0].answer, answer.answer);
}

#[tokio::test]
async fn every_mode_answers() {
    let s = session();
    s.ingest_pages("story.pdf", story()).await.unwrap();
    for mode in s.list_modes() {
        let answer = s.ask("What happened to the village?", mode).await.unwrap();
        assert_eq!(answer.mode.as_str(), mode);
        assert!(!answer.answer.is_empty());
    }
    assert_eq!(s.history().await.len(), 5);
}

#[tokio::test]
async fn empty_question_is_answered() {
    let s = session();
    s.ingest_pages("story.pdf", story()).await.unwrap();
    let answer = s.ask("", "default").await.unwrap();
    assert!(!answer.answer.is_empty());
}

#[tokio::test]
async fn new_upload_replaces_index_and_clears_history() {
    let s = session();
    s.ingest_pages("story.pdf", story()).await.unwrap();
    s.ask("Why did the character leave?", "default").await.unwrap();

    s.ingest_pages(
        "rivers.pdf",
        vec![Page::new(0, "Rivers carve valleys over millions of years.")],
    )
    .await
    .unwrap();

    assert!(s.history().await.is_empty());
    let status = s.status().await;
    assert_eq!(status.current_pdf.as_deref(), Some("rivers.pdf"));
    assert_eq!(status.chunk_count, 1);

    let answer = s.ask("Why did the character leave?", "default").await.unwrap();
    assert!(answer.sources.iter().all(|c| !c.text.contains("village")));
}

#[tokio::test]
async fn failed_ingest_keeps_previous_document() {
    let s = session();
    s.ingest_pages("story.pdf", story()).await.unwrap();
    s.ask("Why did the character leave?", "default").await.unwrap();

    let err = s
        .ingest_pages("blank.pdf", vec![Page::new(0, "   ")])
        .await
        .unwrap_err();
    assert!(matches!(err, QaError::Extraction(_)));

    let err = s.ingest_bytes("notes.txt", b"plain text").await.unwrap_err();
    assert!(matches!(err, QaError::UnsupportedFormat(_)));

    let status = s.status().await;
    assert_eq!(status.current_pdf.as_deref(), Some("story.pdf"));
    assert_eq!(status.history_count, 1);
    assert!(s.ask("Why?", "exam").await.is_ok());
}

#[tokio::test]
async fn concurrent_questions_share_the_index() {
    let s = Arc::new(session());
    s.ingest_pages("story.pdf", story()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let s = Arc::clone(&s);
        handles.push(tokio::spawn(async move {
            s.ask(&format!("Why did the character leave? ({})", i), "summary")
                .await
                .map(|a| a.answer)
        }));
    }
    for handle in handles {
        assert!(!handle.await.unwrap().unwrap().is_empty());
    }
    assert_eq!(s.history().await.len(), 8);
}

#[tokio::test]
async fn ingest_pdf_from_disk() {
    let tmp = TempDir::new().unwrap();
    let path = common::write_file(tmp.path(), "biology.pdf", &common::biology_pdf());

    let s = session();
    let summary = s.ingest_pdf(&path).await.unwrap();
    assert_eq!(summary.filename, "biology.pdf");
    assert_eq!(summary.page_count, 2);
    assert!(summary.chunk_count >= 2);

    let answer = s.ask("Where does photosynthesis happen?", "default").await.unwrap();
    assert!(answer.answer.contains("chloroplasts"), "{}", answer.answer);
}

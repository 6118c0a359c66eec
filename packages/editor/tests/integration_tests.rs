//! End-to-end editing scenarios driven through events

use blockpad_editor::{
    Block, BlockId, CaretPlacement, Document, EditSession, EditorConfig, Handled, ImageSource,
    InputEvent, Key, MemorySurface, Mutation, PostEffectEngine, RenderAdapter, UploadStatus,
};
use std::cell::RefCell;
use std::rc::Rc;

fn shape(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .map(|b| match b {
            Block::Text(t) => format!("Text({})", t.content),
            Block::Image(i) => format!("Image({:?})", i.upload_status),
        })
        .collect()
}

fn session_from(blocks: Vec<Block>) -> (EditSession, MemorySurface) {
    let config = EditorConfig::default();
    let document = Document::from_blocks(blocks, PostEffectEngine::from_config(&config));
    let session = EditSession::with_document(document, &config);
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    (session, surface)
}

fn caret_at(session: &mut EditSession, surface: &mut MemorySurface, block_id: BlockId, offset: usize) {
    session.focus(block_id, offset);
    surface.place_caret(block_id, offset);
}

fn image(id: u64, name: &str) -> Block {
    Block::Image(blockpad_editor::ImageBlock::pending(
        BlockId(id),
        &ImageSource::file(format!("/tmp/{}.png", name)),
    ))
}

#[test]
fn test_split_at_end_of_block() {
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "Hello")]);
    caret_at(&mut session, &mut surface, BlockId(1), 5);

    session.dispatch(&InputEvent::key(Key::Enter), &mut surface);

    let blocks = session.get_document();
    assert_eq!(shape(&blocks), vec!["Text(Hello)", "Text()"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::start_of(blocks[1].id())));
}

#[test]
fn test_merge_with_previous_block() {
    let (mut session, mut surface) =
        session_from(vec![Block::text(BlockId(1), "ab"), Block::text(BlockId(2), "cd")]);
    caret_at(&mut session, &mut surface, BlockId(2), 0);

    session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);

    assert_eq!(shape(&session.get_document()), vec!["Text(abcd)"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::new(BlockId(1), 2)));
}

#[test]
fn test_insert_image_into_empty_document() {
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "")]);
    caret_at(&mut session, &mut surface, BlockId(1), 0);

    session.dispatch(&InputEvent::paste_image(ImageSource::file("/tmp/cat.png")), &mut surface);

    let blocks = session.get_document();
    assert_eq!(shape(&blocks), vec!["Text()", "Image(Pending)", "Text()"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::start_of(blocks[2].id())));
}

#[test]
fn test_backspace_after_image_clears_then_removes_image() {
    let (mut session, mut surface) = session_from(vec![
        Block::text(BlockId(1), ""),
        image(2, "img1"),
        Block::text(BlockId(3), "x"),
    ]);
    caret_at(&mut session, &mut surface, BlockId(3), 0);

    session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);
    assert_eq!(
        shape(&session.get_document()),
        vec!["Text()", "Image(Pending)", "Text()"]
    );
    assert_eq!(surface.focused(), Some(CaretPlacement::start_of(BlockId(3))));

    session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);
    assert_eq!(shape(&session.get_document()), vec!["Text()"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::start_of(BlockId(1))));
}

#[test]
fn test_explicit_image_removal_keeps_invariants() {
    let (mut session, mut surface) = session_from(vec![
        Block::text(BlockId(1), "a"),
        image(2, "img1"),
        Block::text(BlockId(3), "b"),
    ]);

    session.dispatch(&InputEvent::RemoveRequested { block_id: BlockId(2) }, &mut surface);

    // Neighbours are not merged by default
    assert_eq!(shape(&session.get_document()), vec!["Text(a)", "Text(b)"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::start_of(BlockId(3))));
}

#[test]
fn test_explicit_image_removal_with_merging_enabled() {
    let config = EditorConfig {
        merge_adjacent_text: true,
        ..EditorConfig::default()
    };
    let document = Document::from_blocks(
        vec![Block::text(BlockId(1), "a"), image(2, "img1"), Block::text(BlockId(3), "b")],
        PostEffectEngine::from_config(&config),
    );
    let mut session = EditSession::with_document(document, &config);
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());

    session.dispatch(&InputEvent::RemoveRequested { block_id: BlockId(2) }, &mut surface);

    assert_eq!(shape(&session.get_document()), vec!["Text(ab)"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::new(BlockId(1), 1)));
}

#[test]
fn test_enter_splits_with_merging_enabled() {
    let config = EditorConfig {
        merge_adjacent_text: true,
        ..EditorConfig::default()
    };
    let document = Document::from_blocks(
        vec![Block::text(BlockId(1), "Hello")],
        PostEffectEngine::from_config(&config),
    );
    let mut session = EditSession::with_document(document, &config);
    let mut surface = MemorySurface::new();
    surface.sync(session.document().blocks());
    caret_at(&mut session, &mut surface, BlockId(1), 5);

    let handled = session.dispatch(&InputEvent::key(Key::Enter), &mut surface);

    assert_eq!(handled, Handled::Committed { version: 1 });
    let blocks = session.get_document();
    assert_eq!(shape(&blocks), vec!["Text(Hello)", "Text()"]);
    assert_eq!(surface.focused(), Some(CaretPlacement::start_of(blocks[1].id())));
}

#[test]
fn test_split_then_merge_round_trips() {
    let original = "The quick brown fox";
    for k in 0..=original.chars().count() {
        let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), original)]);
        caret_at(&mut session, &mut surface, BlockId(1), k);

        session.dispatch(&InputEvent::key(Key::Enter), &mut surface);
        assert_eq!(session.document().len(), 2);

        // Caret now sits at offset 0 of the tail block
        session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);

        let blocks = session.get_document();
        assert_eq!(blocks.len(), 1, "split at {} did not merge back", k);
        assert_eq!(blocks[0].as_text().unwrap().content, original);
        assert_eq!(surface.focused(), Some(CaretPlacement::new(BlockId(1), k)));
    }
}

#[test]
fn test_backspace_on_sole_empty_block_keeps_it() {
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "")]);
    caret_at(&mut session, &mut surface, BlockId(1), 0);

    for _ in 0..3 {
        session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);
        assert_eq!(session.document().len(), 1);
    }
    assert_eq!(session.get_document()[0].id(), BlockId(1));
}

#[test]
fn test_backspace_on_sole_block_clears_content() {
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "abc")]);
    caret_at(&mut session, &mut surface, BlockId(1), 0);

    session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);

    assert_eq!(shape(&session.get_document()), vec!["Text()"]);
}

#[test]
fn test_image_insertion_block_count_growth() {
    // Following block is text: only the image is added
    let (mut session, mut surface) =
        session_from(vec![Block::text(BlockId(1), "a"), Block::text(BlockId(2), "b")]);
    caret_at(&mut session, &mut surface, BlockId(1), 1);
    session.dispatch(&InputEvent::drop_image(ImageSource::file("/tmp/x.png")), &mut surface);
    assert_eq!(session.document().len(), 3);

    // Nothing follows: image plus a new text block
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "a")]);
    caret_at(&mut session, &mut surface, BlockId(1), 1);
    session.dispatch(&InputEvent::drop_image(ImageSource::file("/tmp/x.png")), &mut surface);
    assert_eq!(session.document().len(), 3);
    assert_eq!(shape(&session.get_document()), vec!["Text(a)", "Image(Pending)", "Text()"]);
}

#[test]
fn test_in_block_backspace_and_typing_are_delegated() {
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "ab")]);
    caret_at(&mut session, &mut surface, BlockId(1), 2);

    let handled = session.dispatch(&InputEvent::key(Key::Backspace), &mut surface);
    assert_eq!(handled, Handled::Delegated);

    // The surface performs the deletion and reports the new content
    let (id, content) = surface.delete_backward().unwrap();
    let handled = session.dispatch(&InputEvent::TextChanged { block_id: id, content }, &mut surface);

    assert!(matches!(handled, Handled::Committed { .. }));
    assert_eq!(shape(&session.get_document()), vec!["Text(a)"]);
}

#[test]
fn test_on_change_fires_once_per_committed_event() {
    let (mut session, mut surface) = session_from(vec![Block::text(BlockId(1), "Hello")]);
    let snapshots = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&snapshots);
    session.on_change(move |blocks| sink.borrow_mut().push(shape(blocks)));

    caret_at(&mut session, &mut surface, BlockId(1), 2);
    session.dispatch(&InputEvent::key(Key::Enter), &mut surface);
    session.dispatch(&InputEvent::key(Key::Other), &mut surface);

    assert_eq!(*snapshots.borrow(), vec![vec!["Text(He)".to_string(), "Text(llo)".to_string()]]);
}

#[test]
fn test_caret_instruction_is_consumed_once() {
    let (mut session, surface) = session_from(vec![Block::text(BlockId(1), "Hello")]);
    session.focus(BlockId(1), 5);

    session.handle_event(&InputEvent::key(Key::Enter), &surface);

    assert!(session.take_pending_caret().is_some());
    assert!(session.take_pending_caret().is_none());
}

#[test]
fn test_caption_edit_through_session() {
    let (mut session, _) = session_from(vec![
        Block::text(BlockId(1), ""),
        image(2, "img1"),
        Block::text(BlockId(3), ""),
    ]);

    session.apply(Mutation::SetCaption {
        block_id: BlockId(2),
        caption: "Sunset".to_string(),
    });

    let image = session.document().image(BlockId(2)).unwrap();
    assert_eq!(image.caption, "Sunset");
    assert_eq!(image.upload_status, UploadStatus::Pending);
}

#[test]
fn test_snapshot_serializes_for_persistence() {
    let (session, _) = session_from(vec![
        Block::text(BlockId(1), "intro"),
        image(2, "img1"),
        Block::text(BlockId(3), ""),
    ]);

    let json = serde_json::to_string(&session.get_document()).unwrap();
    let restored: Vec<Block> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, session.get_document());
}

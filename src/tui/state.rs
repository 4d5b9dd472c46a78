//! Pure state transformations for the TUI (functional core).
//!
//! Only index and scroll arithmetic lives here: no I/O, no mutation,
//! no widget types. The imperative shell (app.rs, events.rs) calls
//! these and owns the side effects.

/// Calculate new selected index after moving up
pub fn move_selection_up(current: usize) -> usize {
    current.saturating_sub(1)
}

/// Calculate new selected index after moving down
pub fn move_selection_down(current: usize, max: usize) -> usize {
    if max == 0 {
        0
    } else {
        (current + 1).min(max - 1)
    }
}

/// Clamp selection index to valid range
pub fn clamp_selection(selected: usize, max: usize) -> usize {
    if max == 0 {
        0
    } else {
        selected.min(max - 1)
    }
}

/// Cursor position after removing the element at the cursor: the prior
/// element when there is one, clamped into the shrunken list.
pub fn cursor_after_remove(cursor: usize, new_len: usize) -> usize {
    if new_len == 0 {
        0
    } else {
        cursor.saturating_sub(1).min(new_len - 1)
    }
}

/// Calculate new selected index after page down
pub fn page_down(current: usize, page_size: usize, max: usize) -> usize {
    if max == 0 {
        0
    } else {
        (current + page_size).min(max - 1)
    }
}

/// Calculate new selected index after page up
pub fn page_up(current: usize, page_size: usize) -> usize {
    current.saturating_sub(page_size)
}

/// Calculate scroll offset to keep selection visible
pub fn calculate_scroll_offset(
    selected: usize,
    current_offset: usize,
    visible_items: usize,
) -> usize {
    if visible_items == 0 {
        return 0;
    }
    if selected < current_offset {
        selected
    } else if selected >= current_offset + visible_items {
        selected.saturating_sub(visible_items - 1)
    } else {
        current_offset
    }
}

/// Scroll offset that puts `target_line` approximately in the middle of
/// a `visible`-line viewport, clamped to the content.
pub fn center_offset(target_line: usize, total_lines: usize, visible: usize) -> usize {
    let max_scroll = total_lines.saturating_sub(visible);
    target_line.saturating_sub(visible / 2).min(max_scroll)
}

/// Fallback preview position when the selected component's content line
/// cannot be located: proportional to the cursor index.
pub fn proportional_offset(index: usize, count: usize, total_lines: usize, visible: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let target = index * total_lines / count;
    center_offset(target, total_lines, visible)
}

/// Scroll a viewport by a signed delta, clamped to valid offsets.
pub fn scroll_by(current: usize, delta: isize, total_lines: usize, visible: usize) -> usize {
    let max_scroll = total_lines.saturating_sub(visible);
    if delta >= 0 {
        (current + delta as usize).min(max_scroll)
    } else {
        current.saturating_sub((-delta) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_selection() {
        assert_eq!(move_selection_up(5), 4);
        assert_eq!(move_selection_up(0), 0);

        assert_eq!(move_selection_down(5, 10), 6);
        assert_eq!(move_selection_down(9, 10), 9);
        assert_eq!(move_selection_down(0, 0), 0);
    }

    #[test]
    fn test_clamp_selection() {
        assert_eq!(clamp_selection(5, 10), 5);
        assert_eq!(clamp_selection(15, 10), 9);
        assert_eq!(clamp_selection(5, 0), 0);
    }

    #[test]
    fn test_cursor_after_remove_walks_to_prior() {
        // Three removals from a 3-element list with the cursor at the end.
        assert_eq!(cursor_after_remove(2, 2), 1);
        assert_eq!(cursor_after_remove(1, 1), 0);
        assert_eq!(cursor_after_remove(0, 0), 0);
        // Removing at the head keeps the cursor at the head.
        assert_eq!(cursor_after_remove(0, 5), 0);
    }

    #[test]
    fn test_page_navigation() {
        assert_eq!(page_down(0, 10, 100), 10);
        assert_eq!(page_down(95, 10, 100), 99);

        assert_eq!(page_up(15, 10), 5);
        assert_eq!(page_up(5, 10), 0);
    }

    #[test]
    fn test_calculate_scroll_offset() {
        // Selection visible - no change
        assert_eq!(calculate_scroll_offset(5, 0, 10), 0);

        // Selection above viewport - scroll up
        assert_eq!(calculate_scroll_offset(2, 5, 10), 2);

        // Selection below viewport - scroll down
        assert_eq!(calculate_scroll_offset(15, 0, 10), 6);
    }

    #[test]
    fn test_center_offset() {
        assert_eq!(center_offset(50, 100, 20), 40);
        // Near the top nothing to center above.
        assert_eq!(center_offset(3, 100, 20), 0);
        // Near the bottom clamps to the last page.
        assert_eq!(center_offset(99, 100, 20), 80);
        // Short content never scrolls.
        assert_eq!(center_offset(5, 10, 20), 0);
    }

    #[test]
    fn test_proportional_offset() {
        assert_eq!(proportional_offset(0, 4, 100, 20), 0);
        assert_eq!(proportional_offset(2, 4, 100, 20), 40);
        assert_eq!(proportional_offset(0, 0, 100, 20), 0);
    }

    #[test]
    fn test_scroll_by() {
        assert_eq!(scroll_by(0, 5, 100, 20), 5);
        assert_eq!(scroll_by(10, -5, 100, 20), 5);
        assert_eq!(scroll_by(75, 10, 100, 20), 80);
        assert_eq!(scroll_by(3, -10, 100, 20), 0);
    }
}

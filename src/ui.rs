use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{Component, DataResource, EventKind, EventOutcome, RenderContext};
use tui_dispatch_components::{
    centered_rect, BaseStyle, Padding, StatusBar, StatusBarHint, StatusBarProps, StatusBarSection,
    StatusBarStyle,
};

use crate::action::Action;
use crate::battle::{Battle, BattlePhase, Combatant, Side};
use crate::sprite::Sprite;
use crate::state::{format_name, AppState, PokemonSummary, Screen, TrainerProfile};

const BG_BASE: Color = Color::Rgb(22, 26, 38);
const BG_PANEL: Color = Color::Rgb(32, 38, 56);
const BG_PANEL_ALT: Color = Color::Rgb(27, 32, 48);
const BG_HEADER: Color = Color::Rgb(38, 32, 52);
const TEXT_MAIN: Color = Color::Rgb(226, 230, 240);
const TEXT_DIM: Color = Color::Rgb(148, 156, 178);
const ACCENT_RED: Color = Color::Rgb(222, 96, 100);
const ACCENT_BLUE: Color = Color::Rgb(110, 156, 230);
const ACCENT_GOLD: Color = Color::Rgb(228, 196, 116);
const ACCENT_GREEN: Color = Color::Rgb(118, 200, 130);
const HIGHLIGHT_BG: Color = ACCENT_BLUE;
const HIGHLIGHT_TEXT: Color = Color::Rgb(18, 22, 32);
const BORDER_ACCENT: Color = Color::Rgb(78, 88, 118);

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, layout[0], state);
    match state.screen {
        Screen::Pokedex => render_pokedex(frame, layout[1], state),
        Screen::Detail => render_detail(frame, layout[1], state),
        Screen::Favorites => render_favorites(frame, layout[1], state),
        Screen::Arena => render_arena(frame, layout[1], state),
        Screen::Leaderboard => render_leaderboard(frame, layout[1], state),
        Screen::Profile => render_profile(frame, layout[1], state),
    }
    render_status_bar(frame, layout[2], state);

    if state.search.active {
        render_search_overlay(frame, area, state);
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if state.search.active {
        return handle_search_key(key);
    }
    if state.profile_edit.active {
        return handle_profile_edit_key(key);
    }

    // Screen switching works everywhere outside text entry.
    match key.code {
        KeyCode::Char('q') => return EventOutcome::action(Action::Quit),
        KeyCode::Char('p') => return EventOutcome::action(Action::ScreenChange(Screen::Pokedex)),
        KeyCode::Char('f') => {
            return EventOutcome::action(Action::ScreenChange(Screen::Favorites))
        }
        KeyCode::Char('b') => return EventOutcome::action(Action::ScreenChange(Screen::Arena)),
        KeyCode::Char('l') => {
            return EventOutcome::action(Action::ScreenChange(Screen::Leaderboard))
        }
        KeyCode::Char('t') => return EventOutcome::action(Action::ScreenChange(Screen::Profile)),
        _ => {}
    }

    match state.screen {
        Screen::Pokedex => handle_pokedex_key(key),
        Screen::Detail => handle_detail_key(key),
        Screen::Favorites => handle_favorites_key(key),
        Screen::Arena => handle_arena_key(key, state),
        Screen::Leaderboard => EventOutcome::ignored(),
        Screen::Profile => handle_profile_key(key),
    }
}

fn handle_search_key(key: KeyEvent) -> EventOutcome<Action> {
    match key.code {
        KeyCode::Esc => EventOutcome::action(Action::SearchCancel),
        KeyCode::Enter => EventOutcome::action(Action::SearchSubmit),
        KeyCode::Backspace => EventOutcome::action(Action::SearchBackspace),
        KeyCode::Char(ch) => EventOutcome::action(Action::SearchInput(ch)),
        _ => EventOutcome::ignored(),
    }
}

fn handle_profile_edit_key(key: KeyEvent) -> EventOutcome<Action> {
    match key.code {
        KeyCode::Esc => EventOutcome::action(Action::ProfileEditCancel),
        KeyCode::Enter => EventOutcome::action(Action::ProfileEditSubmit),
        KeyCode::Backspace => EventOutcome::action(Action::ProfileEditBackspace),
        KeyCode::Char(ch) => EventOutcome::action(Action::ProfileEditInput(ch)),
        _ => EventOutcome::ignored(),
    }
}

fn handle_pokedex_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectionMove(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectionMove(1)),
        KeyCode::PageUp => Some(Action::SelectionPage(-1)),
        KeyCode::PageDown => Some(Action::SelectionPage(1)),
        KeyCode::Home => Some(Action::SelectionJumpTop),
        KeyCode::End => Some(Action::SelectionJumpBottom),
        KeyCode::Enter => Some(Action::DetailOpen),
        KeyCode::Char('/') => Some(Action::SearchStart),
        KeyCode::Char(' ') => Some(Action::FavoriteToggle),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_detail_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Esc | KeyCode::Backspace => Some(Action::DetailClose),
        KeyCode::Char(' ') => Some(Action::FavoriteToggle),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_favorites_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectionMove(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectionMove(1)),
        KeyCode::Char('d') | KeyCode::Delete => Some(Action::FavoriteRemove),
        KeyCode::Char('e') => Some(Action::FavoritesExport),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_arena_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    match state.arena.battle.as_ref() {
        None => {
            let action = match key.code {
                KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectionMove(-1)),
                KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectionMove(1)),
                KeyCode::Enter => Some(Action::BattleStart),
                _ => None,
            };
            EventOutcome::from(action)
        }
        Some(battle) => {
            let action = match key.code {
                KeyCode::Esc => Some(Action::BattleReset),
                KeyCode::Enter if battle.is_over() => Some(Action::BattleReset),
                KeyCode::Enter => Some(Action::BattleAttack),
                _ => None,
            };
            EventOutcome::from(action)
        }
    }
}

fn handle_profile_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Char('e') => Some(Action::ProfileEditStart),
        _ => None,
    };
    EventOutcome::from(action)
}

// ============================================================================
// Header + status bar
// ============================================================================

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" POKEARENA ", BG_HEADER);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = Vec::new();
    for screen in [
        Screen::Pokedex,
        Screen::Favorites,
        Screen::Arena,
        Screen::Leaderboard,
        Screen::Profile,
    ] {
        let active = state.screen == screen
            || (state.screen == Screen::Detail && screen == Screen::Pokedex);
        let style = if active {
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_DIM)
        };
        spans.push(Span::styled(screen.label().to_string(), style));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        format!("trainer: {}", state.profile.username),
        Style::default().fg(ACCENT_BLUE),
    ));
    if let Some(message) = &state.message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            message.clone(),
            Style::default().fg(ACCENT_GOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans));
    frame.render_widget(paragraph, inner);
}

fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let hint = |key: &'static str, label: &'static str| StatusBarHint::new(key, label);
    let (left, right) = match state.screen {
        Screen::Pokedex => (
            vec![hint("Up/Down", "Select"), hint("Enter", "Detail")],
            vec![hint("/", "Search"), hint("Space", "Favorite"), hint("q", "Quit")],
        ),
        Screen::Detail => (
            vec![hint("Esc", "Back"), hint("Space", "Favorite")],
            vec![hint("q", "Quit")],
        ),
        Screen::Favorites => (
            vec![hint("Up/Down", "Select"), hint("d", "Remove")],
            vec![hint("e", "Export CSV"), hint("q", "Quit")],
        ),
        Screen::Arena => (
            vec![hint("Up/Down", "Select"), hint("Enter", "Fight")],
            vec![hint("Esc", "Reset"), hint("q", "Quit")],
        ),
        Screen::Leaderboard => (vec![], vec![hint("q", "Quit")]),
        Screen::Profile => (vec![hint("e", "Edit name")], vec![hint("q", "Quit")]),
    };
    let center = vec![
        hint("p", "Pokedex"),
        hint("f", "Favorites"),
        hint("b", "Battle"),
        hint("l", "Ranks"),
        hint("t", "Trainer"),
    ];

    let mut status_bar = StatusBar::new();
    let props = StatusBarProps {
        left: StatusBarSection::hints(&left),
        center: StatusBarSection::hints(&center),
        right: StatusBarSection::hints(&right),
        style: status_bar_style(),
        is_focused: false,
    };
    <StatusBar as Component<Action>>::render(&mut status_bar, frame, area, props);
}

fn status_bar_style() -> StatusBarStyle {
    StatusBarStyle {
        base: BaseStyle {
            border: None,
            padding: Padding::xy(1, 0),
            bg: Some(BG_PANEL_ALT),
            fg: None,
        },
        text: Style::default().fg(TEXT_MAIN),
        hint_key: Style::default()
            .fg(ACCENT_GOLD)
            .add_modifier(Modifier::BOLD),
        hint_label: Style::default().fg(TEXT_DIM),
        separator: Style::default().fg(TEXT_DIM),
    }
}

// ============================================================================
// Pokedex + detail
// ============================================================================

fn render_pokedex(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(area);

    render_catalog_list(frame, layout[0], state);
    render_catalog_side(frame, layout[1], state);
}

fn render_catalog_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = if state.search.query.is_empty() {
        " POKEDEX ".to_string()
    } else {
        format!(" POKEDEX [{}] ", state.search.query)
    };
    let block = panel_block(title.as_str(), BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.catalog.is_loading() {
        render_centered_note(frame, inner, "Loading Pokemon...");
        return;
    }
    if let DataResource::Failed(error) = &state.catalog {
        render_centered_note(frame, inner, &format!("Pokedex error: {}", error));
        return;
    }
    if state.filtered_indices.is_empty() {
        render_centered_note(frame, inner, "No Pokemon found matching your search.");
        return;
    }

    let visible = inner.height as usize;
    let offset = scroll_offset(state.selected_index, state.filtered_indices.len(), visible);

    let mut lines = Vec::with_capacity(visible);
    for filtered_pos in (offset..state.filtered_indices.len()).take(visible) {
        let entry_idx = state.filtered_indices[filtered_pos];
        let Some(entry) = state.catalog_entries().get(entry_idx) else {
            continue;
        };
        let marker = if state.is_favorite(entry.id) { "♥" } else { " " };
        let label = format!(
            "#{:03} {} {}",
            entry.id,
            format_name(&entry.name),
            marker
        );
        lines.push(menu_line(&label, filtered_pos == state.selected_index));
    }
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn render_catalog_side(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" INFO ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(entry) = state.selected_entry() else {
        render_centered_note(frame, inner, "Discover and explore Pokemon");
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("#{:03} {}", entry.id, format_name(&entry.name)),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )),
        Line::from(" "),
    ];
    match state.summaries.get(&entry.name) {
        Some(summary) => {
            lines.push(type_line(&summary.types));
            lines.push(Line::from(" "));
            lines.extend(stat_lines(summary));
        }
        None => lines.push(Line::from(Span::styled(
            "Press Enter for full details.",
            Style::default().fg(TEXT_DIM),
        ))),
    }
    lines.push(Line::from(" "));
    lines.push(Line::from(Span::styled(
        format!("Favorites: {}/10", state.favorites.len()),
        Style::default().fg(TEXT_DIM),
    )));

    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let name = state.detail_name.clone().unwrap_or_default();
    let title = format!(" {} ", format_name(&name).to_ascii_uppercase());
    let block = panel_block(title.as_str(), BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.detail_loading {
        render_centered_note(frame, inner, "Loading Pokemon...");
        return;
    }
    let Some(summary) = state.current_detail() else {
        render_centered_note(frame, inner, "No data for this Pokemon.");
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(24), Constraint::Length(34)])
        .split(inner);

    render_sprite_panel(
        frame,
        layout[0],
        state,
        summary.sprite_front.as_deref(),
        Alignment::Center,
    );

    let mut lines = vec![
        Line::from(Span::styled(
            format!("#{:03}", summary.id),
            Style::default().fg(TEXT_DIM),
        )),
        type_line(&summary.types),
        Line::from(" "),
    ];
    lines.extend(stat_lines(summary));
    lines.push(Line::from(" "));
    let favorite = state.is_favorite(summary.id);
    lines.push(Line::from(Span::styled(
        if favorite {
            "♥ In your favorites"
        } else {
            "Space: add to favorites"
        },
        Style::default().fg(if favorite { ACCENT_RED } else { TEXT_DIM }),
    )));

    frame.render_widget(Paragraph::new(Text::from(lines)), layout[1]);
}

// ============================================================================
// Favorites
// ============================================================================

fn render_favorites(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = format!(" MY FAVORITES ({} SAVED) ", state.favorites.len());
    let block = panel_block(title.as_str(), BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.favorites.is_empty() {
        render_centered_note(
            frame,
            inner,
            "No favorites yet. Explore the Pokedex and press Space!",
        );
        return;
    }

    let mut lines = Vec::new();
    for (idx, favorite) in state.favorites.iter().enumerate() {
        let summary = state.summaries.get(&favorite.pokemon_name);
        let types = summary
            .map(|s| s.types.join("/"))
            .unwrap_or_default();
        let label = format!(
            "#{:03} {:<14} {:<16} added {}",
            favorite.pokemon_id,
            format_name(&favorite.pokemon_name),
            types,
            favorite.added_at.format("%Y-%m-%d"),
        );
        lines.push(menu_line(&label, idx == state.favorites_selected));
    }
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ============================================================================
// Battle arena
// ============================================================================

fn render_arena(frame: &mut Frame, area: Rect, state: &AppState) {
    match state.arena.battle.as_ref() {
        None => render_fighter_select(frame, area, state),
        Some(battle) => render_battle(frame, area, state, battle),
    }
}

fn render_fighter_select(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(area);

    let block = panel_block(" CHOOSE YOUR FIGHTER ", BG_PANEL);
    let inner = block.inner(layout[0]);
    frame.render_widget(block, layout[0]);

    if state.arena.roster.is_loading() {
        render_centered_note(frame, inner, "Finding opponents...");
    } else if let DataResource::Failed(error) = &state.arena.roster {
        render_centered_note(frame, inner, &format!("Roster error: {}", error));
    } else if state.arena.roster_entries().is_empty() {
        render_centered_note(frame, inner, "No fighters available.");
    } else {
        let mut lines = Vec::new();
        for (idx, summary) in state.arena.roster_entries().iter().enumerate() {
            let label = format!("#{:03} {}", summary.id, format_name(&summary.name));
            lines.push(menu_line(&label, idx == state.arena.selected));
        }
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    let preview = panel_block(" PREVIEW ", BG_PANEL_ALT);
    let preview_inner = preview.inner(layout[1]);
    frame.render_widget(preview, layout[1]);

    if let Some(summary) = state.arena.selected_fighter() {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(30)])
            .split(preview_inner);
        render_sprite_panel(
            frame,
            split[0],
            state,
            summary.sprite_front.as_deref(),
            Alignment::Center,
        );
        let mut lines = vec![
            Line::from(Span::styled(
                format_name(&summary.name),
                Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
            )),
            type_line(&summary.types),
            Line::from(" "),
        ];
        lines.extend(stat_lines(summary));
        lines.push(Line::from(" "));
        lines.push(Line::from(Span::styled(
            "Enter: Start Battle!",
            Style::default().fg(ACCENT_GREEN),
        )));
        frame.render_widget(Paragraph::new(Text::from(lines)), split[1]);
    } else {
        render_centered_note(frame, preview_inner, "Select a Pokemon");
    }
}

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState, battle: &Battle) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8)])
        .split(area);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[0]);

    render_combatant_panel(frame, panels[0], state, &battle.player, Side::Player);
    render_combatant_panel(frame, panels[1], state, &battle.opponent, Side::Opponent);
    render_battle_log(frame, layout[1], state, battle);
}

fn render_combatant_panel(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    combatant: &Combatant,
    side: Side,
) {
    let (title_color, title) = match side {
        Side::Player => (ACCENT_BLUE, format!(" {} ", combatant.name.to_ascii_uppercase())),
        Side::Opponent => (
            ACCENT_RED,
            format!(" WILD {} ", combatant.name.to_ascii_uppercase()),
        ),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Title::from(Span::styled(
            title,
            Style::default().fg(title_color).add_modifier(Modifier::BOLD),
        )))
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(2)])
        .split(inner);

    let lines = vec![
        hp_line(combatant.hp, combatant.max_hp),
        type_line(&combatant.types),
    ];
    frame.render_widget(Paragraph::new(Text::from(lines)), layout[0]);

    render_sprite_panel(
        frame,
        layout[1],
        state,
        combatant.sprite_url.as_deref(),
        Alignment::Center,
    );
}

fn render_battle_log(frame: &mut Frame, area: Rect, state: &AppState, battle: &Battle) {
    let block = panel_block(" BATTLE LOG ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height.saturating_sub(2) as usize;
    let start = battle.log.len().saturating_sub(visible.max(1));
    let mut lines: Vec<Line> = battle.log[start..]
        .iter()
        .map(|entry| Line::from(entry.clone()))
        .collect();

    lines.push(Line::from(" "));
    let prompt = match battle.phase {
        BattlePhase::InProgress { turn: Side::Player } => Line::from(vec![
            Span::styled("Enter", Style::default().fg(ACCENT_GOLD)),
            Span::styled(": Attack", Style::default().fg(TEXT_DIM)),
        ]),
        BattlePhase::InProgress {
            turn: Side::Opponent,
        } => {
            let dots = ".".repeat((state.tick % 4) as usize);
            Line::from(Span::styled(
                format!("Opponent is attacking{}", dots),
                Style::default().fg(TEXT_DIM),
            ))
        }
        BattlePhase::Ended { winner } => {
            let verdict = match winner {
                Side::Player => Span::styled(
                    "Victory! ",
                    Style::default().fg(ACCENT_GREEN).add_modifier(Modifier::BOLD),
                ),
                Side::Opponent => Span::styled(
                    "Defeat! ",
                    Style::default().fg(ACCENT_RED).add_modifier(Modifier::BOLD),
                ),
            };
            Line::from(vec![
                verdict,
                Span::styled("Enter: Battle Again", Style::default().fg(TEXT_DIM)),
            ])
        }
    };
    lines.push(prompt);

    frame.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
        inner,
    );
}

// ============================================================================
// Leaderboard + profile
// ============================================================================

fn render_leaderboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" LEADERBOARD ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.leaderboard.is_loading() {
        render_centered_note(frame, inner, "Loading leaderboard...");
        return;
    }
    if let DataResource::Failed(error) = &state.leaderboard {
        render_centered_note(frame, inner, &format!("Leaderboard error: {}", error));
        return;
    }
    let entries = state.leaderboard.data().map(Vec::as_slice).unwrap_or(&[]);
    if entries.is_empty() {
        render_centered_note(
            frame,
            inner,
            "No ranked trainers yet. Fight at least 5 battles!",
        );
        return;
    }

    let mut lines = vec![
        Line::from(Span::styled(
            "Win: 3 points - ranked by score, then wins",
            Style::default().fg(TEXT_DIM),
        )),
        Line::from(" "),
    ];
    for (idx, entry) in entries.iter().enumerate() {
        lines.push(leaderboard_line(idx, entry, &state.profile.username));
    }
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn leaderboard_line(idx: usize, entry: &TrainerProfile, current: &str) -> Line<'static> {
    let medal_color = match idx {
        0 => ACCENT_GOLD,
        1 => Color::Rgb(180, 186, 200),
        2 => Color::Rgb(196, 142, 96),
        _ => TEXT_DIM,
    };
    let highlight = entry.username == current;
    let name_style = if highlight {
        Style::default().fg(ACCENT_BLUE).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MAIN)
    };
    Line::from(vec![
        Span::styled(format!("{:>2}. ", idx + 1), Style::default().fg(medal_color)),
        Span::styled(format!("{:<20}", entry.username), name_style),
        Span::styled(
            format!("{:>4} pts  ", entry.total_score),
            Style::default().fg(ACCENT_GOLD),
        ),
        Span::styled(
            format!("{:>3}W/{:<3}L  ", entry.battles_won, entry.battles_lost),
            Style::default().fg(TEXT_DIM),
        ),
        Span::styled(
            format!("{:>5.1}%  ", entry.win_rate_pct()),
            Style::default().fg(TEXT_DIM),
        ),
        Span::styled(entry.rank().to_string(), Style::default().fg(ACCENT_GREEN)),
    ])
}

fn render_profile(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(24)])
        .split(area);

    let block = panel_block(" TRAINER ", BG_PANEL);
    let inner = block.inner(layout[0]);
    frame.render_widget(block, layout[0]);

    let profile = &state.profile;
    let mut lines = Vec::new();
    if state.profile_edit.active {
        lines.push(Line::from(vec![
            Span::styled("Name: ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("{}_", state.profile_edit.input),
                Style::default().fg(ACCENT_GOLD),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            "Enter: save  Esc: cancel",
            Style::default().fg(TEXT_DIM),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            profile.username.clone(),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("Rank: {}", profile.rank()),
            Style::default().fg(ACCENT_GREEN),
        )));
    }
    lines.push(Line::from(" "));
    lines.push(Line::from(Span::styled(
        format!("Battles: {}", profile.total_battles),
        Style::default().fg(TEXT_MAIN),
    )));
    lines.push(Line::from(vec![
        Span::styled(
            format!("Won: {}  ", profile.battles_won),
            Style::default().fg(ACCENT_GREEN),
        ),
        Span::styled(
            format!("Lost: {}", profile.battles_lost),
            Style::default().fg(ACCENT_RED),
        ),
    ]));
    lines.push(Line::from(Span::styled(
        format!("Win rate: {:.1}%", profile.win_rate_pct()),
        Style::default().fg(TEXT_DIM),
    )));
    lines.push(Line::from(Span::styled(
        format!("Score: {} pts", profile.total_score),
        Style::default().fg(ACCENT_GOLD),
    )));
    lines.push(Line::from(" "));
    lines.push(Line::from(Span::styled(
        format!("Favorites saved: {}/10", state.favorites.len()),
        Style::default().fg(TEXT_DIM),
    )));
    lines.push(Line::from(Span::styled(
        format!("Trainer since {}", profile.created_at.format("%Y-%m-%d")),
        Style::default().fg(TEXT_DIM),
    )));
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);

    render_recent_battles(frame, layout[1], state);
}

fn render_recent_battles(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" RECENT BATTLES ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.recent_battles.is_loading() {
        render_centered_note(frame, inner, "Loading battles...");
        return;
    }
    if let DataResource::Failed(error) = &state.recent_battles {
        render_centered_note(frame, inner, &format!("Battle history error: {}", error));
        return;
    }
    let records = state
        .recent_battles
        .data()
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if records.is_empty() {
        render_centered_note(frame, inner, "No battles yet. Enter the arena!");
        return;
    }

    let mut lines = Vec::new();
    for record in records {
        let (tag, tag_color) = match record.winner {
            Side::Player => ("WIN ", ACCENT_GREEN),
            Side::Opponent => ("LOSS", ACCENT_RED),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", tag), Style::default().fg(tag_color)),
            Span::styled(
                format!(
                    "{} vs {} ",
                    record.player_pokemon, record.opponent_pokemon
                ),
                Style::default().fg(TEXT_MAIN),
            ),
            Span::styled(
                format!(
                    "({}-{})  {}",
                    record.player_hp,
                    record.opponent_hp,
                    record.recorded_at.format("%Y-%m-%d %H:%M"),
                ),
                Style::default().fg(TEXT_DIM),
            ),
        ]));
    }
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ============================================================================
// Search overlay
// ============================================================================

fn render_search_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let modal = centered_rect(50, 5, area);
    frame.render_widget(Clear, modal);
    let block = panel_block(" SEARCH ", BG_PANEL);
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let lines = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT_GOLD)),
            Span::styled(
                format!("{}_", state.search.query),
                Style::default().fg(TEXT_MAIN),
            ),
        ]),
        Line::from(Span::styled(
            format!("{} matches - name, number or type", state.filtered_indices.len()),
            Style::default().fg(TEXT_DIM),
        )),
        Line::from(Span::styled(
            "Enter: apply  Esc: clear",
            Style::default().fg(TEXT_DIM),
        )),
    ];
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ============================================================================
// Shared widgets
// ============================================================================

fn render_sprite_panel(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    sprite_url: Option<&str>,
    alignment: Alignment,
) {
    let Some(url) = sprite_url else {
        render_centered_note(frame, area, "[no sprite]");
        return;
    };
    match state.sprite_cache.get(url) {
        Some(sprite) => {
            let lines = sprite_lines(sprite, area.width, area.height);
            let paragraph = Paragraph::new(Text::from(lines)).alignment(alignment);
            frame.render_widget(paragraph, area);
        }
        None if state.sprites_loading.contains(url) => {
            render_centered_note(frame, area, "[loading]");
        }
        None => {
            render_centered_note(frame, area, "[no sprite]");
        }
    }
}

/// Renders a decoded sprite as half-block cells: each terminal cell covers
/// one pixel column and two pixel rows of the (cropped, downscaled) image.
fn sprite_lines(sprite: &Sprite, max_cols: u16, max_rows: u16) -> Vec<Line<'static>> {
    let Some((x0, y0, width, height)) = sprite.content_bounds() else {
        return Vec::new();
    };
    let max_width = max_cols.max(1) as u32;
    let max_height = (max_rows.max(1) as u32) * 2;
    let scale = ((width + max_width - 1) / max_width)
        .max((height + max_height - 1) / max_height)
        .max(1);
    let cols = (width + scale - 1) / scale;
    let rows = (height + 2 * scale - 1) / (2 * scale);

    let pixel = |col: u32, row_px: u32| -> Option<Color> {
        let x = x0 + col * scale;
        let y = y0 + row_px * scale;
        if y >= y0 + height {
            return None;
        }
        if !sprite.is_opaque(x, y) {
            return None;
        }
        sprite.pixel(x, y).map(|px| Color::Rgb(px[0], px[1], px[2]))
    };

    let mut lines = Vec::with_capacity(rows as usize);
    for row in 0..rows {
        let mut spans = Vec::with_capacity(cols as usize);
        for col in 0..cols {
            let top = pixel(col, row * 2);
            let bottom = pixel(col, row * 2 + 1);
            spans.push(match (top, bottom) {
                (Some(top), Some(bottom)) => {
                    Span::styled("▀", Style::default().fg(top).bg(bottom))
                }
                (Some(top), None) => Span::styled("▀", Style::default().fg(top)),
                (None, Some(bottom)) => Span::styled("▄", Style::default().fg(bottom)),
                (None, None) => Span::raw(" "),
            });
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn stat_lines(summary: &PokemonSummary) -> Vec<Line<'static>> {
    let stat = |label: &str, value: Option<u16>| -> Line<'static> {
        match value {
            Some(value) => meter_line(label, value as u32, 160, 12, ACCENT_BLUE),
            None => Line::from(vec![
                Span::styled(format!("{} ", label), Style::default().fg(TEXT_DIM)),
                Span::styled("?", Style::default().fg(TEXT_DIM)),
            ]),
        }
    };
    vec![
        stat("HP ", summary.hp),
        stat("ATK", summary.attack),
        stat("DEF", summary.defense),
        stat("SPD", summary.speed),
    ]
}

fn type_line(types: &[String]) -> Line<'static> {
    if types.is_empty() {
        return Line::from(Span::styled("unknown type", Style::default().fg(TEXT_DIM)));
    }
    let mut spans = Vec::new();
    for tag in types {
        spans.push(Span::styled(
            format!(" {} ", tag),
            Style::default()
                .fg(Color::Rgb(18, 22, 32))
                .bg(type_color(tag)),
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn type_color(tag: &str) -> Color {
    match tag {
        "normal" => Color::Rgb(168, 168, 120),
        "fire" => Color::Rgb(240, 128, 48),
        "water" => Color::Rgb(104, 144, 240),
        "electric" => Color::Rgb(248, 208, 48),
        "grass" => Color::Rgb(120, 200, 80),
        "ice" => Color::Rgb(152, 216, 216),
        "fighting" => Color::Rgb(192, 48, 40),
        "poison" => Color::Rgb(160, 64, 160),
        "ground" => Color::Rgb(224, 192, 104),
        "flying" => Color::Rgb(168, 144, 240),
        "psychic" => Color::Rgb(248, 88, 136),
        "bug" => Color::Rgb(168, 184, 32),
        "rock" => Color::Rgb(184, 160, 56),
        "ghost" => Color::Rgb(112, 88, 152),
        "dragon" => Color::Rgb(112, 56, 248),
        "dark" => Color::Rgb(112, 88, 72),
        "steel" => Color::Rgb(184, 184, 208),
        "fairy" => Color::Rgb(238, 153, 172),
        _ => Color::Rgb(168, 168, 120),
    }
}

fn hp_line(current: u16, max: u16) -> Line<'static> {
    let width: usize = 14;
    let ratio = if max == 0 {
        0.0
    } else {
        current as f32 / max as f32
    };
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    let color = if ratio > 0.5 {
        ACCENT_GREEN
    } else if ratio > 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_RED
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("░".repeat(empty), Style::default().fg(TEXT_DIM)),
        Span::raw(format!(" {}/{}", current, max)),
    ])
}

fn meter_line(label: &str, current: u32, max: u32, width: usize, color: Color) -> Line<'static> {
    let max = max.max(1);
    let ratio = (current as f32 / max as f32).min(1.0);
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    Line::from(vec![
        Span::styled(format!("{} ", label), Style::default().fg(TEXT_DIM)),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("░".repeat(empty), Style::default().fg(TEXT_DIM)),
        Span::styled(format!(" {}", current), Style::default().fg(TEXT_DIM)),
    ])
}

fn menu_line(label: &str, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default()
            .fg(HIGHLIGHT_TEXT)
            .bg(HIGHLIGHT_BG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MAIN)
    };
    Line::from(Span::styled(label.to_string(), style))
}

fn render_centered_note(frame: &mut Frame, area: Rect, note: &str) {
    let paragraph = Paragraph::new(note.to_string())
        .style(Style::default().fg(TEXT_DIM))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn scroll_offset(selected: usize, len: usize, visible: usize) -> usize {
    if visible == 0 || len <= visible {
        return 0;
    }
    let half = visible / 2;
    if selected <= half {
        0
    } else {
        (selected - half).min(len - visible)
    }
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}

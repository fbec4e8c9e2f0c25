/*!
 * # Prompt Capture
 *
 * [`PromptEngine`] owns the single capture session and is the only thing a
 * host talks to. The host forwards page events into it and acts on what
 * comes back:
 *
 * - `input` events go to [`PromptEngine::handle_input`], which may start a
 *   session when the trigger is typed.
 * - `keydown` events go to [`PromptEngine::handle_key`]. Anything other than
 *   [`KeyOutcome::PassThrough`] means the host must stop the event from
 *   reaching the page.
 * - Pointer presses and window blur may end the session.
 * - A submission yields a [`PendingGeneration`]. Its response comes back via
 *   [`PromptEngine::resolve`] and is ignored unless it still belongs to the
 *   live session.
 *
 * The session is reset exactly once per capture, which releases its anchor.
 */

pub mod commands;
pub mod keys;
pub mod session;

use std::time::Duration;

pub use commands::{Clock, SystemClock};
pub use keys::{Key, KeyPress, Modifiers, Platform};
pub use session::{Mode, Phase, PromptBuffer, Session, SessionId, Suggestions};

use crate::context::{self, ContextLimits};
use crate::generation::{GenerationRequest, GenerationResponse, GenerationTicket, PendingGeneration};
use crate::insertion::{self, InsertOutcome, NativeValueWriter, ValueWriter};
use crate::overlay::{self, OverlayView};
use crate::page::{NodeId, Page};
use crate::trigger;

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub platform: Platform,
    /// Initial state of the context toggle for new sessions
    pub include_context: bool,
    /// How long a failure message stays up before the session resets
    pub error_display: Duration,
    pub context: ContextLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            include_context: false,
            error_display: Duration::from_secs(2),
            context: ContextLimits::default(),
        }
    }
}

/// What the host should do with a key event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Let the page have it
    PassThrough,
    /// Prevent default and stop propagation
    Consumed,
    /// Consumed; run this generation and report back through `resolve`
    Submitted(PendingGeneration),
}

/// Part of the overlay that was pressed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverlayHit {
    Card,
    ContextToggle,
    Suggestion(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    Page(NodeId),
    Overlay(OverlayHit),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    /// No session; the page handles the press as usual
    Ignored,
    /// Pressed inside the overlay; stop propagation, session continues
    Absorbed,
    /// Pressed elsewhere; the session was reset
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Inserted(InsertOutcome),
    /// The error is on screen; call `expire_failure` after `display_for`
    Failed { display_for: Duration },
    /// The response no longer belongs to a live submission
    Discarded,
}

pub struct PromptEngine<W = NativeValueWriter, C = SystemClock> {
    config: EngineConfig,
    writer: W,
    clock: C,
    session: Option<Session>,
    requests: u64,
}

impl PromptEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(config, NativeValueWriter, SystemClock)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<W: ValueWriter, C: Clock> PromptEngine<W, C> {
    pub fn with_parts(config: EngineConfig, writer: W, clock: C) -> Self {
        Self {
            config,
            writer,
            clock,
            session: None,
            requests: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.session.as_ref().map_or(Mode::Idle, Session::mode)
    }

    /// An `input` event fired on `target`. Returns true if capture started.
    pub fn handle_input(&mut self, page: &mut Page, target: NodeId) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(detection) = trigger::detect(page, target) else {
            return false;
        };

        let session = Session::new(
            detection.surface,
            detection.anchor,
            self.config.include_context,
        );
        log::info!("capture session {} started ({:?})", session.id, session.mode());
        self.session = Some(session);
        true
    }

    pub fn handle_key(&mut self, page: &mut Page, press: KeyPress) -> KeyOutcome {
        let Some(session) = self.session.as_ref() else {
            return KeyOutcome::PassThrough;
        };
        if !session.surface.is_live(page) {
            log::debug!("capture surface lost focus, cancelling");
            self.reset(page);
            return KeyOutcome::PassThrough;
        }

        let platform = self.config.platform;
        let is_submit = platform.is_submit(&press);
        let phase = session.phase.clone();

        if press.key == Key::Escape {
            self.reset(page);
            return KeyOutcome::Consumed;
        }
        // No shortcut reaches the page while capturing
        if press.modifiers.is_chord() && !is_submit {
            return KeyOutcome::Consumed;
        }

        match phase {
            Phase::Editing if is_submit => self.submit(page),
            Phase::Editing => {
                self.edit(press);
                KeyOutcome::Consumed
            }
            // A request is outstanding or an error is showing
            Phase::Sending { .. } | Phase::Failed { .. } => KeyOutcome::Consumed,
        }
    }

    fn edit(&mut self, press: KeyPress) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let suggesting = session.suggestions.is_visible();

        match press.key {
            Key::Backspace => session.backspace(),
            Key::ArrowDown if suggesting => session.suggestions.move_down(),
            Key::ArrowUp if suggesting => session.suggestions.move_up(),
            Key::Tab | Key::Enter if suggesting => session.accept_suggestion(),
            _ => {
                if let Some(c) = press.printable() {
                    session.type_char(c);
                }
            }
        }
    }

    fn submit(&mut self, page: &Page) -> KeyOutcome {
        let Some(session) = self.session.as_mut() else {
            return KeyOutcome::PassThrough;
        };

        let prompt = commands::expand_macros(session.buffer.trimmed(), &self.clock.now());
        let prompt_text = if session.include_context {
            let context = context::collect(page, session.surface, &session.anchor, self.config.context);
            with_context(&context, &prompt)
        } else {
            prompt
        };

        self.requests += 1;
        let request = self.requests;
        session.phase = Phase::Sending { request };
        session.suggestions.close();

        log::info!("session {} submitted request {request}", session.id);
        KeyOutcome::Submitted(PendingGeneration {
            ticket: GenerationTicket {
                session: session.id,
                request,
            },
            request: GenerationRequest { prompt_text },
        })
    }

    /// A generation finished. Only the outstanding request of the live
    /// session is acted on.
    pub fn resolve(
        &mut self,
        page: &mut Page,
        ticket: GenerationTicket,
        response: GenerationResponse,
    ) -> Resolution {
        let outstanding = self.session.as_ref().is_some_and(|session| {
            session.id == ticket.session
                && session.phase == Phase::Sending {
                    request: ticket.request,
                }
        });
        if !outstanding {
            log::debug!(
                "discarding response for session {} request {}",
                ticket.session,
                ticket.request
            );
            return Resolution::Discarded;
        }

        match response.into_result() {
            Ok(text) => {
                let Some(session) = self.session.take() else {
                    return Resolution::Discarded;
                };
                let outcome = insertion::insert(page, &self.writer, session.anchor, &text);
                log::info!("session {} finished: {outcome:?}", session.id);
                Resolution::Inserted(outcome)
            }
            Err(message) => {
                log::warn!("generation failed: {message}");
                if let Some(session) = self.session.as_mut() {
                    session.phase = Phase::Failed { message };
                }
                Resolution::Failed {
                    display_for: self.config.error_display,
                }
            }
        }
    }

    /// The failure display interval for `session` ran out
    pub fn expire_failure(&mut self, page: &mut Page, session: SessionId) -> bool {
        let failed = self
            .session
            .as_ref()
            .is_some_and(|s| s.id == session && matches!(s.phase, Phase::Failed { .. }));
        if failed {
            self.reset(page);
        }
        failed
    }

    pub fn handle_pointer_down(&mut self, page: &mut Page, target: PointerTarget) -> PointerOutcome {
        let Some(session) = self.session.as_mut() else {
            return PointerOutcome::Ignored;
        };

        match target {
            PointerTarget::Page(_) => {
                self.reset(page);
                PointerOutcome::Cancelled
            }
            PointerTarget::Overlay(hit) => {
                if session.phase == Phase::Editing {
                    match hit {
                        OverlayHit::ContextToggle => {
                            session.include_context = !session.include_context;
                        }
                        OverlayHit::Suggestion(index) => {
                            if session.suggestions.select(index) {
                                session.accept_suggestion();
                            }
                        }
                        OverlayHit::Card => {}
                    }
                }
                PointerOutcome::Absorbed
            }
        }
    }

    /// The window lost focus
    pub fn handle_blur(&mut self, page: &mut Page) {
        self.reset(page);
    }

    pub fn cancel(&mut self, page: &mut Page) {
        self.reset(page);
    }

    pub fn overlay(&self, page: &Page) -> Option<OverlayView> {
        let session = self.session.as_ref()?;
        Some(overlay::render(page, session, self.config.platform))
    }

    fn reset(&mut self, page: &mut Page) {
        if let Some(session) = self.session.take() {
            log::info!("capture session {} reset", session.id);
            session.anchor.release(page);
        }
    }
}

fn with_context(context: &str, prompt: &str) -> String {
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("Context:\n{context}\n\nRequest:\n{prompt}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TextField;
    use chrono::{DateTime, Local, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
        }
    }

    fn engine() -> PromptEngine<NativeValueWriter, FixedClock> {
        let config = EngineConfig {
            platform: Platform::Other,
            ..EngineConfig::default()
        };
        PromptEngine::with_parts(config, NativeValueWriter, FixedClock)
    }

    fn capturing(value: &str) -> (PromptEngine<NativeValueWriter, FixedClock>, Page, NodeId) {
        let mut page = Page::new();
        let field = page.create_field(TextField::textarea(value));
        page.append_child(page.document(), field).unwrap();
        page.focus(field);
        let mut engine = engine();
        assert!(engine.handle_input(&mut page, field));
        (engine, page, field)
    }

    fn type_text<W: ValueWriter, C: Clock>(engine: &mut PromptEngine<W, C>, page: &mut Page, text: &str) {
        for c in text.chars() {
            assert_eq!(engine.handle_key(page, KeyPress::char(c)), KeyOutcome::Consumed);
        }
    }

    fn submit<W: ValueWriter, C: Clock>(
        engine: &mut PromptEngine<W, C>,
        page: &mut Page,
    ) -> PendingGeneration {
        match engine.handle_key(page, KeyPress::new(Key::Enter, Modifiers::ctrl())) {
            KeyOutcome::Submitted(pending) => pending,
            other => panic!("expected a submission, got {other:?}"),
        }
    }

    #[test]
    fn with_context_formats_payload() {
        assert_eq!(with_context("", "hi"), "hi");
        assert_eq!(
            with_context("Dear team", "hi"),
            "Context:\nDear team\n\nRequest:\nhi"
        );
    }

    #[test]
    fn idle_engine_passes_keys_through() {
        let mut page = Page::new();
        let mut engine = engine();
        assert_eq!(
            engine.handle_key(&mut page, KeyPress::char('a')),
            KeyOutcome::PassThrough
        );
        assert_eq!(engine.mode(), Mode::Idle);
    }

    #[test]
    fn no_detection_while_capturing() {
        let (mut engine, mut page, field) = capturing("/ai");
        let first = engine.session().map(Session::id);

        page.field_mut(field).unwrap().assign_value("x/ai".into());
        assert!(!engine.handle_input(&mut page, field));
        assert_eq!(engine.session().map(Session::id), first);
        assert_eq!(page.field(field).unwrap().value(), "x/ai");
    }

    #[rstest]
    #[case::paste(Key::Char('v'), Modifiers::ctrl())]
    #[case::undo(Key::Char('z'), Modifiers::ctrl())]
    #[case::word_delete(Key::Backspace, Modifiers::ctrl())]
    #[case::cmd_paste(Key::Char('v'), Modifiers::meta())]
    #[case::cmd_enter_off_apple(Key::Enter, Modifiers::meta())]
    fn shortcuts_are_swallowed_while_capturing(#[case] key: Key, #[case] modifiers: Modifiers) {
        let (mut engine, mut page, field) = capturing("Hello /ai");
        type_text(&mut engine, &mut page, "ab");

        assert_eq!(
            engine.handle_key(&mut page, KeyPress::new(key, modifiers)),
            KeyOutcome::Consumed
        );
        assert_eq!(engine.mode(), Mode::CapturingFlat);
        assert_eq!(engine.session().unwrap().buffer().as_str(), "ab");
        assert_eq!(page.field(field).unwrap().value(), "Hello ");
    }

    #[test]
    fn unhandled_keys_are_swallowed() {
        let (mut engine, mut page, _) = capturing("/ai");
        assert_eq!(
            engine.handle_key(&mut page, KeyPress::plain(Key::Other)),
            KeyOutcome::Consumed
        );
        assert_eq!(
            engine.handle_key(&mut page, KeyPress::plain(Key::Enter)),
            KeyOutcome::Consumed
        );
        assert!(engine.session().unwrap().buffer().is_empty());
    }

    #[test]
    fn submit_expands_macros_without_context() {
        let (mut engine, mut page, _) = capturing("/ai");
        type_text(&mut engine, &mut page, "  due /tomorrow  ");
        let pending = submit(&mut engine, &mut page);
        assert_eq!(pending.request.prompt_text, "due 2024-03-10");
        assert_eq!(pending.ticket.request, 1);
    }

    #[test]
    fn submit_prefixes_context_when_toggled() {
        let (mut engine, mut page, _) = capturing("Dear team, /ai");
        assert_eq!(
            engine.handle_pointer_down(&mut page, PointerTarget::Overlay(OverlayHit::ContextToggle)),
            PointerOutcome::Absorbed
        );
        type_text(&mut engine, &mut page, "reply");
        let pending = submit(&mut engine, &mut page);
        assert_eq!(
            pending.request.prompt_text,
            "Context:\nDear team,\n\nRequest:\nreply"
        );
    }

    #[test]
    fn reentrant_submit_is_ignored() {
        let (mut engine, mut page, _) = capturing("/ai");
        type_text(&mut engine, &mut page, "x");
        submit(&mut engine, &mut page);
        assert_eq!(
            engine.handle_key(&mut page, KeyPress::new(Key::Enter, Modifiers::ctrl())),
            KeyOutcome::Consumed
        );
        assert_eq!(
            engine.handle_key(&mut page, KeyPress::char('y')),
            KeyOutcome::Consumed
        );
        assert_eq!(engine.session().unwrap().buffer().as_str(), "x");
    }

    #[test]
    fn failure_shows_then_expires() {
        let (mut engine, mut page, field) = capturing("ab/ai");
        let pending = submit(&mut engine, &mut page);

        let resolution = engine.resolve(
            &mut page,
            pending.ticket,
            GenerationResponse::failure("API key not set"),
        );
        assert_eq!(
            resolution,
            Resolution::Failed {
                display_for: Duration::from_secs(2)
            }
        );
        assert_eq!(
            engine.session().unwrap().phase(),
            &Phase::Failed {
                message: "API key not set".to_string()
            }
        );

        assert!(engine.expire_failure(&mut page, pending.ticket.session));
        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(page.field(field).unwrap().value(), "ab");
    }

    #[test]
    fn escape_dismisses_failure_early() {
        let (mut engine, mut page, _) = capturing("/ai");
        let pending = submit(&mut engine, &mut page);
        engine.resolve(&mut page, pending.ticket, GenerationResponse::success(""));

        assert_eq!(
            engine.handle_key(&mut page, KeyPress::plain(Key::Escape)),
            KeyOutcome::Consumed
        );
        assert_eq!(engine.mode(), Mode::Idle);
        assert!(!engine.expire_failure(&mut page, pending.ticket.session));
    }

    #[test]
    fn expire_ignores_other_sessions() {
        let (mut engine, mut page, _) = capturing("/ai");
        let pending = submit(&mut engine, &mut page);
        assert!(!engine.expire_failure(&mut page, pending.ticket.session));
        assert_eq!(engine.mode(), Mode::CapturingFlat);
    }

    #[test]
    fn clicking_a_suggestion_applies_it() {
        let (mut engine, mut page, _) = capturing("/ai");
        type_text(&mut engine, &mut page, "/da");
        engine.handle_pointer_down(&mut page, PointerTarget::Overlay(OverlayHit::Suggestion(1)));

        let session = engine.session().unwrap();
        assert_eq!(session.buffer().as_str(), "/datetime");
        assert!(!session.suggestions().is_visible());
    }

    #[test]
    fn pointer_on_page_cancels() {
        let (mut engine, mut page, field) = capturing("/ai");
        assert_eq!(
            engine.handle_pointer_down(&mut page, PointerTarget::Page(field)),
            PointerOutcome::Cancelled
        );
        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(
            engine.handle_pointer_down(&mut page, PointerTarget::Page(field)),
            PointerOutcome::Ignored
        );
    }

    #[test]
    fn focus_loss_cancels_before_handling_key() {
        let (mut engine, mut page, _) = capturing("/ai");
        page.blur();
        assert_eq!(
            engine.handle_key(&mut page, KeyPress::char('a')),
            KeyOutcome::PassThrough
        );
        assert_eq!(engine.mode(), Mode::Idle);
    }

    #[test]
    fn window_blur_cancels() {
        let (mut engine, mut page, _) = capturing("/ai");
        engine.handle_blur(&mut page);
        assert_eq!(engine.mode(), Mode::Idle);
    }
}

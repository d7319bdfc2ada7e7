//! Turn Aggregator (C3): reduces the raw inbound Turn event stream into a
//! clean per-utterance lifecycle, producing the live hypothesis and the
//! end-of-utterance final text.

use voiceflow_foundation::clock::SharedClock;

use crate::model::{Turn, TurnWord, Utterance};

/// One inbound Turn event, already decoded by the streaming client.
#[derive(Debug, Clone)]
pub struct TurnEvent {
    pub transcript: String,
    pub words: Vec<TurnWord>,
    pub end_of_turn: bool,
    pub turn_is_formatted: bool,
}

/// What the aggregator tells downstream consumers happened. Each variant
/// carries what a consumer needs without having to peek at internal state
/// at exactly the right moment — useful since a single `on_turn` call can
/// produce more than one output (closing one utterance and opening the
/// next).
#[derive(Debug, Clone)]
pub enum AggregatorOutput {
    HypothesisChanged { utterance_id: u64 },
    UtteranceEndedUnformatted { utterance_id: u64, unformatted_text: String },
    UtteranceEndedFormatted {
        utterance_id: u64,
        final_text: String,
        consumed_by_command: bool,
    },
    UtteranceAborted { utterance_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NoUtterance,
    Open,
    AwaitingFormatted,
}

pub struct TurnAggregator {
    state: State,
    utterance: Option<Utterance>,
    next_id: u64,
    pub grace_ms: u64,
    clock: SharedClock,
}

impl TurnAggregator {
    pub fn new(grace_ms: u64, clock: SharedClock) -> Self {
        Self {
            state: State::NoUtterance,
            utterance: None,
            next_id: 1,
            grace_ms,
            clock,
        }
    }

    pub fn utterance(&self) -> Option<&Utterance> {
        self.utterance.as_ref()
    }

    pub fn utterance_mut(&mut self) -> Option<&mut Utterance> {
        self.utterance.as_mut()
    }

    pub fn is_awaiting_formatted(&self) -> bool {
        self.state == State::AwaitingFormatted
    }

    fn open_new(&mut self, turn: Turn) -> AggregatorOutput {
        let id = self.next_id;
        self.next_id += 1;
        self.utterance = Some(Utterance::new(id, turn));
        self.state = State::Open;
        AggregatorOutput::HypothesisChanged { utterance_id: id }
    }

    /// Closes whatever utterance is open "as in the timeout row": formatted
    /// text falls back to the unformatted final text. Used by both the
    /// real grace timeout and the AwaitingFormatted -> Open edge, which the
    /// state table specifies as "close the previous, then open new".
    fn close_with_fallback(&mut self) -> Option<AggregatorOutput> {
        let utterance = self.utterance.take()?;
        self.state = State::NoUtterance;
        let consumed_by_command = utterance.consumed_by_command;
        let final_text = utterance
            .formatted_text
            .unwrap_or_else(|| utterance.unformatted_final_text.unwrap_or_default());
        Some(AggregatorOutput::UtteranceEndedFormatted {
            utterance_id: utterance.id,
            final_text,
            consumed_by_command,
        })
    }

    fn build_turn(&self, event: &TurnEvent) -> Turn {
        Turn {
            transcript: event.transcript.clone(),
            words: event.words.clone(),
            end_of_turn: event.end_of_turn,
            turn_is_formatted: event.turn_is_formatted,
            received_at: self.clock.now(),
        }
    }

    pub fn on_turn(&mut self, event: TurnEvent) -> Vec<AggregatorOutput> {
        let turn = self.build_turn(&event);
        let mut outputs = Vec::new();

        match self.state {
            State::NoUtterance => {
                outputs.push(self.open_new(turn));
            }
            State::Open => {
                if !event.end_of_turn {
                    if let Some(u) = &mut self.utterance {
                        u.turn = turn;
                    }
                    if let Some(id) = self.utterance.as_ref().map(|u| u.id) {
                        outputs.push(AggregatorOutput::HypothesisChanged { utterance_id: id });
                    }
                } else if !event.turn_is_formatted {
                    let id = self.utterance.as_ref().map(|u| u.id).unwrap_or_default();
                    if let Some(u) = &mut self.utterance {
                        u.turn = turn;
                        u.unformatted_final_text = Some(event.transcript.clone());
                    }
                    self.state = State::AwaitingFormatted;
                    outputs.push(AggregatorOutput::UtteranceEndedUnformatted {
                        utterance_id: id,
                        unformatted_text: event.transcript.clone(),
                    });
                } else {
                    // end_of_turn + formatted arriving directly from Open, with
                    // no preceding unformatted end-of-turn: treated as a
                    // combined event, no grace timer (see DESIGN.md).
                    let id = self.utterance.as_ref().map(|u| u.id).unwrap_or_default();
                    if let Some(u) = &mut self.utterance {
                        u.turn = turn;
                        u.formatted_text = Some(event.transcript.clone());
                    }
                    let consumed_by_command = self
                        .utterance
                        .as_ref()
                        .map(|u| u.consumed_by_command)
                        .unwrap_or(false);
                    self.state = State::NoUtterance;
                    let final_text = event.transcript.clone();
                    self.utterance = None;
                    outputs.push(AggregatorOutput::UtteranceEndedFormatted {
                        utterance_id: id,
                        final_text,
                        consumed_by_command,
                    });
                }
            }
            State::AwaitingFormatted => {
                if event.end_of_turn && event.turn_is_formatted {
                    let id = self.utterance.as_ref().map(|u| u.id).unwrap_or_default();
                    let consumed_by_command = self
                        .utterance
                        .as_ref()
                        .map(|u| u.consumed_by_command)
                        .unwrap_or(false);
                    let final_text = event.transcript.clone();
                    self.state = State::NoUtterance;
                    self.utterance = None;
                    outputs.push(AggregatorOutput::UtteranceEndedFormatted {
                        utterance_id: id,
                        final_text,
                        consumed_by_command,
                    });
                } else if !event.end_of_turn {
                    if let Some(out) = self.close_with_fallback() {
                        outputs.push(out);
                    }
                    outputs.push(self.open_new(turn));
                } else {
                    // end_of_turn true, still unformatted: not enumerated by
                    // the state table. Treated as a refreshed unformatted
                    // final — the grace timer already running is left
                    // untouched rather than restarted.
                    if let Some(u) = &mut self.utterance {
                        u.turn = turn;
                        u.unformatted_final_text = Some(event.transcript.clone());
                    }
                }
            }
        }

        outputs
    }

    pub fn on_grace_timeout(&mut self) -> Vec<AggregatorOutput> {
        if self.state != State::AwaitingFormatted {
            return Vec::new();
        }
        self.close_with_fallback().into_iter().collect()
    }

    pub fn on_connection_lost(&mut self) -> Vec<AggregatorOutput> {
        match self.utterance.take() {
            Some(u) => {
                self.state = State::NoUtterance;
                vec![AggregatorOutput::UtteranceAborted { utterance_id: u.id }]
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceflow_foundation::clock::TestClock;
    use std::sync::Arc;
    use std::time::Duration;

    fn word(text: &str, is_final: bool) -> TurnWord {
        TurnWord {
            text: text.to_string(),
            is_final,
            start_ms: None,
            end_ms: None,
        }
    }

    fn turn(transcript: &str, words: Vec<TurnWord>, eot: bool, formatted: bool) -> TurnEvent {
        TurnEvent {
            transcript: transcript.to_string(),
            words,
            end_of_turn: eot,
            turn_is_formatted: formatted,
        }
    }

    #[test]
    fn first_turn_opens_an_utterance() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);
        let outputs = agg.on_turn(turn("tab", vec![word("tab", false)], false, false));
        assert_eq!(outputs.len(), 1);
        assert!(matches!(outputs[0], AggregatorOutput::HypothesisChanged { utterance_id: 1 }));
    }

    #[test]
    fn scenario_single_wake_command_lifecycle() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);

        agg.on_turn(turn("tab", vec![word("tab", false)], false, false));
        agg.on_turn(turn("tab back", vec![word("tab", false), word("back", false)], false, false));
        let unformatted = agg.on_turn(turn("tab back", vec![], true, false));
        assert!(matches!(
            unformatted[0],
            AggregatorOutput::UtteranceEndedUnformatted { ref unformatted_text, .. }
                if unformatted_text == "tab back"
        ));

        let formatted = agg.on_turn(turn("Tab back.", vec![], true, true));
        assert_eq!(formatted.len(), 1);
        assert!(matches!(
            formatted[0],
            AggregatorOutput::UtteranceEndedFormatted { ref final_text, .. }
                if final_text == "Tab back."
        ));
    }

    #[test]
    fn grace_timeout_falls_back_to_unformatted_text() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);
        agg.on_turn(turn("hello", vec![word("hello", false)], false, false));
        agg.on_turn(turn("hello", vec![], true, false));
        assert!(agg.is_awaiting_formatted());

        let outputs = agg.on_grace_timeout();
        assert_eq!(outputs.len(), 1);
        assert!(matches!(
            outputs[0],
            AggregatorOutput::UtteranceEndedFormatted { ref final_text, .. } if final_text == "hello"
        ));
        assert!(!agg.is_awaiting_formatted());
    }

    #[test]
    fn combined_formatted_event_without_preceding_unformatted_skips_grace() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);
        agg.on_turn(turn("hello", vec![word("hello", false)], false, false));
        let outputs = agg.on_turn(turn("Hello.", vec![], true, true));
        assert_eq!(outputs.len(), 1);
        assert!(matches!(outputs[0], AggregatorOutput::UtteranceEndedFormatted { .. }));
        assert!(!agg.is_awaiting_formatted());
    }

    #[test]
    fn new_turn_while_awaiting_formatted_closes_previous_then_opens_next() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);
        agg.on_turn(turn("hello", vec![word("hello", false)], false, false));
        agg.on_turn(turn("hello", vec![], true, false));

        let outputs = agg.on_turn(turn("world", vec![word("world", false)], false, false));
        assert_eq!(outputs.len(), 2);
        assert!(matches!(outputs[0], AggregatorOutput::UtteranceEndedFormatted { ref final_text, .. } if final_text == "hello"));
        assert!(matches!(outputs[1], AggregatorOutput::HypothesisChanged { utterance_id: 2 }));
    }

    #[test]
    fn connection_lost_aborts_open_utterance() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);
        agg.on_turn(turn("hello", vec![word("hello", false)], false, false));
        let outputs = agg.on_connection_lost();
        assert_eq!(outputs.len(), 1);
        assert!(matches!(outputs[0], AggregatorOutput::UtteranceAborted { .. }));
        assert!(agg.utterance().is_none());
    }

    #[test]
    fn grace_timeout_is_a_no_op_outside_awaiting_formatted() {
        let clock = voiceflow_foundation::clock::test_clock();
        let mut agg = TurnAggregator::new(500, clock);
        agg.on_turn(turn("hello", vec![word("hello", false)], false, false));
        assert!(agg.on_grace_timeout().is_empty());
    }

    #[test]
    fn utterance_ids_are_monotonic_across_utterances() {
        let test_clock = Arc::new(TestClock::new());
        let clock: SharedClock = test_clock.clone();
        let mut agg = TurnAggregator::new(500, clock);

        agg.on_turn(turn("a", vec![], true, true));
        let outputs = agg.on_turn(turn("b", vec![], true, true));
        test_clock.advance(Duration::from_millis(1));
        assert!(matches!(outputs[0], AggregatorOutput::UtteranceEndedFormatted { utterance_id: 2, .. }));
    }
}

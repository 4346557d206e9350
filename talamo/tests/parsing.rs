use talamo::block::display::to_markup;
use talamo::block::{
    BlockType, CalloutKind, ChartKind, ContentNode, Decision, Hint, RevealPolicy, ScenarioContext,
    TradeAction,
};
use talamo::defaults;
use talamo::parser::hints::{ShapeWarning, normalize_hints};
use talamo::parser::scanner::{Segment, scan};
use talamo::parser::sections::{parse_attributes, split_sections};
use talamo::parser::{BlockError, Parser, tokenize};

const V1_SIM: &str = r#":::trading-sim asset="EURUSD" scenario="uptrend_pullback"
[educational_context]
Pullbacks in an uptrend often find support.
[scenario_data]
{"historical": [1.08, 1.082], "current": 1.085, "future": [1.087, 1.09], "correctAction": "buy", "entry": 1.085}
[question]
Buy, sell or wait?
[feedback_buy]
Nice, the trend continued.
:::"#;

const V2_SIM: &str = r#":::trading-sim asset="GBPUSD" scenario="breakout" v="2" chart="candles" timeframe="M15" actions="market_buy,market_sell,skip"
[market]
{"symbol": "GBPUSD", "session": "London", "liquidity": "high"}
[risk]
{"entry": 1.085, "stopLoss": 1.08, "takeProfit": 1.09}
[dataset]
{"historical": [1.081, 1.083], "current": 1.085, "future": [1.088, 1.095], "correctAction": "market_buy"}
[context]
Price is pressing against resistance.
[hints]
- Look at the session
- Watch the last candle
[rubric]
{"direction": 0.6, "risk": 0.4}
[question]
What is your order?
[feedback_general]
Breakouts need follow-through.
[feedback_buy]
Long it is.
:::"#;

fn single(source: &str) -> ContentNode {
    let nodes = tokenize(source);
    assert_eq!(nodes.len(), 1, "expected one node, got {:#?}", nodes);
    nodes.into_iter().next().unwrap()
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[test]
fn prose_only_document() {
    let nodes = tokenize("# Title\n\nSome text.\n");
    assert_eq!(nodes.len(), 1);
    match &nodes[0] {
        ContentNode::Prose(p) => assert_eq!(p.markdown, "# Title\n\nSome text."),
        other => panic!("expected prose, got {:?}", other),
    }
}

#[test]
fn empty_and_blank_documents() {
    assert!(tokenize("").is_empty());
    assert!(tokenize("  \n\n\t\n").is_empty());
}

#[test]
fn nested_fence_does_not_close_outer_block() {
    let source = ":::callout\nA\n:::accordion\n## X\nY\n:::\nB\n:::";
    let segments = scan(source);
    assert_eq!(segments.len(), 1);
    let Segment::Fence(span) = &segments[0] else {
        panic!("expected fence");
    };
    assert_eq!(span.body_raw, "A\n:::accordion\n## X\nY\n:::\nB");
    assert_eq!(span.end_offset, source.len());

    let ContentNode::Callout(callout) = single(source) else {
        panic!("expected callout");
    };
    let ContentNode::Accordion(accordion) = tokenize(&callout.body_markdown)
        .into_iter()
        .find(|n| matches!(n, ContentNode::Accordion(_)))
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(accordion.items.len(), 1);
    assert_eq!(accordion.items[0].title, "X");
    assert_eq!(accordion.items[0].body_markdown, "Y");
}

#[test]
fn nesting_counts_any_known_type() {
    // The inner tabs opener raises depth even though the outer block is a flipcard.
    let source = ":::flipcard\n[front]\n:::tabs\n[label=\"a\"]\nx\n:::\n[back]\nB\n:::\nafter";
    let nodes = tokenize(source);
    assert_eq!(nodes.len(), 2);
    let ContentNode::FlipCard(card) = &nodes[0] else {
        panic!("expected flipcard, got {:?}", nodes[0]);
    };
    assert!(card.front_markdown.contains(":::tabs"));
    assert_eq!(card.back_markdown, "B");
    assert!(matches!(&nodes[1], ContentNode::Prose(p) if p.markdown == "after"));
}

#[test]
fn unterminated_fence_runs_to_end() {
    let parser = Parser::new(":::callout type=\"warning\"\nHello".to_string(), 0);
    let lesson = parser.parse();
    assert_eq!(lesson.blocks.len(), 1);
    match &lesson.blocks[0].node {
        ContentNode::Callout(c) => {
            assert_eq!(c.kind, CalloutKind::Warning);
            assert_eq!(c.body_markdown, "Hello");
        }
        other => panic!("expected callout, got {:?}", other),
    }
    assert_eq!(lesson.diagnostics.len(), 1);
    assert!(!lesson.has_errors());
    assert!(lesson.diagnostics[0].message.contains("never closed"));
}

#[test]
fn unknown_fence_type_is_prose() {
    let nodes = tokenize(":::quiz\nQ?\n:::");
    assert_eq!(nodes.len(), 1);
    assert!(matches!(&nodes[0], ContentNode::Prose(_)));
}

#[test]
fn type_name_must_end_at_whitespace() {
    let nodes = tokenize(":::callouts\nbody\n:::");
    assert!(matches!(&nodes[0], ContentNode::Prose(_)));
}

#[test]
fn closer_allows_surrounding_whitespace() {
    let nodes = tokenize(":::callout\nbody\n  :::  \ntail");
    assert_eq!(nodes.len(), 2);
    assert!(matches!(&nodes[0], ContentNode::Callout(c) if c.body_markdown == "body"));
}

#[test]
fn crlf_line_endings() {
    let nodes = tokenize("intro\r\n:::callout type=\"tip\"\r\nbody\r\n:::\r\noutro\r\n");
    assert_eq!(nodes.len(), 3);
    match &nodes[1] {
        ContentNode::Callout(c) => {
            assert_eq!(c.kind, CalloutKind::Tip);
            assert_eq!(c.body_markdown, "body");
        }
        other => panic!("expected callout, got {:?}", other),
    }
}

#[test]
fn prose_interleaves_in_order() {
    let source = "one\n:::callout\nA\n:::\n\ntwo\n:::flipcard\n[front]\nF\n[back]\nB\n:::\nthree";
    let kinds: Vec<&str> = tokenize(source).iter().map(|n| n.kind_name()).collect();
    assert_eq!(kinds, ["prose", "callout", "prose", "flipcard", "prose"]);
}

#[test]
fn spans_cover_source() {
    let source = "intro\n:::callout\nA\n:::\noutro";
    let lesson = Parser::new(source.to_string(), 3).parse();
    assert_eq!(lesson.source_id, 3);
    let spans: Vec<_> = lesson.blocks.iter().map(|b| b.span.clone()).collect();
    assert_eq!(spans, vec![0..6, 6..23, 23..28]);
    assert_eq!(&source[spans[1].clone()], ":::callout\nA\n:::\n");
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

#[test]
fn attributes_ignore_noise_and_unknown_keys() {
    let attrs = parse_attributes(r#"asset="EURUSD" bogus scenario="a b" v="2" broken="x"#);
    assert_eq!(attrs.get("asset").map(String::as_str), Some("EURUSD"));
    assert_eq!(attrs.get("scenario").map(String::as_str), Some("a b"));
    assert_eq!(attrs.get("v").map(String::as_str), Some("2"));
    assert!(!attrs.contains_key("broken"));
}

#[test]
fn sections_stop_at_next_header_only() {
    let body = "[hints]\n[\n  \"a\"\n]\n[question]\nWhy?\n[label=\"x\"]\nstill question";
    let sections = split_sections(body);
    let names: Vec<&str> = sections.iter().map(|s| s.name).collect();
    assert_eq!(names, ["hints", "question"]);
    assert_eq!(sections[0].text, "[\n  \"a\"\n]");
    assert_eq!(sections[1].text, "Why?\n[label=\"x\"]\nstill question");
}

#[test]
fn accordion_items() {
    let node = single(":::accordion\n## First\nBody one\n\n## Second\nBody two\nmore\n:::");
    let ContentNode::Accordion(accordion) = node else {
        panic!("expected accordion");
    };
    assert_eq!(accordion.items.len(), 2);
    assert_eq!(accordion.items[0].title, "First");
    assert_eq!(accordion.items[0].body_markdown, "Body one");
    assert_eq!(accordion.items[1].title, "Second");
    assert_eq!(accordion.items[1].body_markdown, "Body two\nmore");
}

#[test]
fn accordion_preamble_is_titled_by_its_first_line() {
    let node = single(":::accordion\nOverview\nRead these in order.\n## Details\nMore\n:::");
    let ContentNode::Accordion(accordion) = node else {
        panic!("expected accordion");
    };
    let items: Vec<(&str, &str)> = accordion
        .items
        .iter()
        .map(|i| (i.title.as_str(), i.body_markdown.as_str()))
        .collect();
    assert_eq!(items, [("Overview", "Read these in order."), ("Details", "More")]);
}

#[test]
fn tabs_items() {
    let node = single(":::tabs\n[label=\"Long\"]\nBuy the dip.\n[label=\"Short\"] Sell the rip.\n:::");
    let ContentNode::Tabs(tabs) = node else {
        panic!("expected tabs");
    };
    let pairs: Vec<(&str, &str)> = tabs
        .items
        .iter()
        .map(|t| (t.label.as_str(), t.body_markdown.as_str()))
        .collect();
    assert_eq!(pairs, [("Long", "Buy the dip."), ("Short", "Sell the rip.")]);
}

#[test]
fn flipcard_defaults_missing_side() {
    let ContentNode::FlipCard(card) = single(":::flipcard\n[FRONT]\nWhat is a pip?\n:::") else {
        panic!("expected flipcard");
    };
    assert_eq!(card.front_markdown, "What is a pip?");
    assert_eq!(card.back_markdown, defaults::FLIPCARD_BACK);

    let ContentNode::FlipCard(card) = single(":::flipcard\nno markers\n:::") else {
        panic!("expected flipcard");
    };
    assert_eq!(card.front_markdown, defaults::FLIPCARD_FRONT);
    assert_eq!(card.back_markdown, defaults::FLIPCARD_BACK);
}

#[test]
fn callout_kind_defaults_to_info() {
    let lesson = Parser::new(":::callout type=\"shout\"\nHey\n:::".to_string(), 0).parse();
    assert!(matches!(&lesson.blocks[0].node, ContentNode::Callout(c) if c.kind == CalloutKind::Info));
    assert_eq!(lesson.diagnostics.len(), 1);

    assert!(matches!(single(":::callout\nHey\n:::"), ContentNode::Callout(c) if c.kind == CalloutKind::Info));
}

#[test]
fn meta_and_step_are_not_visual() {
    let source = ":::meta level=\"beginner\" tags=\"forex, risk\"\nduration: 10 min\nid: lesson-1\n:::\n:::step title=\"Intro\"\nWelcome\n:::\nBody";
    let lesson = Parser::new(source.to_string(), 0).parse();
    assert_eq!(lesson.blocks.len(), 3);
    assert_eq!(lesson.visual_blocks().count(), 1);

    let meta = lesson.meta().unwrap();
    assert_eq!(meta.level.as_deref(), Some("beginner"));
    assert_eq!(meta.duration_label.as_deref(), Some("10 min"));
    assert_eq!(meta.tags, ["forex", "risk"]);
    assert_eq!(meta.id.as_deref(), Some("lesson-1"));

    let steps: Vec<_> = lesson.steps().collect();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].title, "Intro");
    assert_eq!(steps[0].body_markdown, "Welcome");
}

// ---------------------------------------------------------------------------
// Trading simulator blocks
// ---------------------------------------------------------------------------

#[test]
fn trading_sim_v1() {
    let ContentNode::TradingSimV1(sim) = single(V1_SIM) else {
        panic!("expected v1 simulator");
    };
    assert_eq!(sim.asset, "EURUSD");
    assert_eq!(sim.scenario_id, "uptrend_pullback");
    assert_eq!(sim.scenario_data.historical, [1.08, 1.082]);
    assert_eq!(sim.scenario_data.current, 1.085);
    assert_eq!(sim.scenario_data.future, [1.087, 1.09]);
    assert_eq!(sim.scenario_data.correct_action, Decision::Buy);
    assert_eq!(sim.scenario_data.entry, Some(1.085));
    assert_eq!(sim.question, "Buy, sell or wait?");
    assert_eq!(sim.feedback.buy, "Nice, the trend continued.");
    assert_eq!(sim.feedback.sell, defaults::FEEDBACK_SELL);
    assert_eq!(sim.feedback.skip, defaults::FEEDBACK_SKIP);
    assert_eq!(
        sim.educational_context.as_deref(),
        Some("Pullbacks in an uptrend often find support.")
    );
    assert!(sim.annotations.is_none());
}

#[test]
fn trading_sim_v1_defaults() {
    let ContentNode::TradingSimV1(sim) = single(
        ":::trading-sim\n[scenario_data]\n{\"current\": 1.2, \"correct_action\": \"skip\"}\n:::",
    ) else {
        panic!("expected v1 simulator");
    };
    assert_eq!(sim.asset, defaults::ASSET);
    assert_eq!(sim.scenario_id, defaults::SCENARIO_ID);
    assert_eq!(sim.question, defaults::QUESTION);
    assert!(sim.scenario_data.historical.is_empty());
    assert!(sim.scenario_data.future.is_empty());
    assert_eq!(sim.scenario_data.correct_action, Decision::Skip);
}

#[test]
fn trading_sim_v1_missing_scenario_data() {
    let ContentNode::Malformed(block) = single(":::trading-sim\n[question]\nHm?\n:::") else {
        panic!("expected malformed block");
    };
    assert_eq!(block.block_type, BlockType::TradingSim);
    assert_eq!(
        block.error,
        BlockError::MissingSection {
            section: "scenario_data".into()
        }
    );
}

#[test]
fn trading_sim_v2() {
    let ContentNode::TradingSimV2(sim) = single(V2_SIM) else {
        panic!("expected v2 simulator");
    };
    assert_eq!(sim.asset, "GBPUSD");
    assert_eq!(sim.chart_kind, ChartKind::Candles);
    assert_eq!(sim.timeframe, "M15");
    assert_eq!(sim.reveal_policy, RevealPolicy::AfterDecision);
    assert_eq!(
        sim.actions,
        [TradeAction::MarketBuy, TradeAction::MarketSell, TradeAction::Skip]
    );
    assert_eq!(sim.entry(), 1.085);
    assert_eq!(sim.stop_loss(), Some(1.08));
    assert_eq!(sim.take_profit(), Some(1.09));
    assert_eq!(sim.dataset.correct_action.as_deref(), Some("market_buy"));

    let market = sim.market.as_ref().unwrap();
    assert_eq!(market.symbol(), Some("GBPUSD"));
    assert_eq!(market.session(), Some("London"));
    assert_eq!(market.fields["liquidity"], "high");

    assert_eq!(
        sim.context,
        Some(ScenarioContext::Text(
            "Price is pressing against resistance.".into()
        ))
    );
    assert_eq!(sim.hints.len(), 2);
    assert_eq!(sim.hints[1].text, "Watch the last candle");
    assert_eq!(sim.rubric.as_ref().unwrap()["direction"], 0.6);

    assert_eq!(sim.feedback_for(TradeAction::MarketBuy), "Long it is.");
    assert_eq!(sim.feedback_for(TradeAction::MarketSell), "Breakouts need follow-through.");
}

#[test]
fn nested_block_errors_point_at_the_outer_block() {
    let source = "Intro\n\n:::callout\n:::accordion\n## A\n:::trading-sim\n[scenario_data]\n{\"current\": 1.0,}\n:::\n:::\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    assert!(!lesson.has_errors());

    let nested = lesson.nested_diagnostics(8);
    assert_eq!(nested.len(), 1);
    assert!(nested[0].is_error());
    assert!(nested[0].message.contains("invalid JSON in [scenario_data]"));
    assert_eq!(nested[0].span, lesson.blocks[1].span);
    assert!(nested[0].notes.iter().any(|n| n.contains("accordion")));

    assert!(lesson.nested_diagnostics(2).is_empty());
}

#[test]
fn market_is_an_open_object() {
    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[market]\n{\"volatility\": 0.8, \"spread\": \"1.2 pips\", \"symbol\": 42}\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    assert!(!lesson.has_errors(), "{:?}", lesson.diagnostics);
    let ContentNode::TradingSimV2(sim) = &lesson.blocks[0].node else {
        panic!("expected v2 simulator, got {}", lesson.blocks[0].node.kind_name());
    };
    let market = sim.market.as_ref().unwrap();
    assert_eq!(market.volatility().as_deref(), Some("0.8"));
    assert_eq!(market.spread(), None);
    assert_eq!(market.symbol(), None);
    assert_eq!(market.fields["spread"], "1.2 pips");
}

#[test]
fn market_that_is_not_an_object_warns() {
    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[market]\n[1, 2]\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    let ContentNode::TradingSimV2(sim) = &lesson.blocks[0].node else {
        panic!("expected v2 simulator");
    };
    assert_eq!(sim.market, None);
    assert!(!lesson.has_errors());
    assert_eq!(lesson.diagnostics.len(), 1);
    assert!(lesson.diagnostics[0].message.starts_with("[market] ignored"));
}

#[test]
fn annotation_labels_accept_scalars() {
    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[annotations]\n[{\"index\": 2, \"label\": 5}, {\"price\": 1.1, \"text\": \"Resistance\"}]\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    assert!(lesson.diagnostics.is_empty(), "{:?}", lesson.diagnostics);
    let ContentNode::TradingSimV2(sim) = &lesson.blocks[0].node else {
        panic!("expected v2 simulator");
    };
    let labels: Vec<&str> = sim
        .annotations
        .iter()
        .flatten()
        .map(|a| a.label.as_str())
        .collect();
    assert_eq!(labels, ["5", "Resistance"]);
}

#[test]
fn unreadable_annotations_are_skipped_with_a_warning() {
    let source = ":::trading-sim\n[scenario_data]\n{\"current\": 1.0, \"correctAction\": \"buy\"}\n[annotations]\n[{\"index\": -3, \"label\": \"x\"}, {\"index\": 1, \"label\": \"kept\"}]\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    let ContentNode::TradingSimV1(sim) = &lesson.blocks[0].node else {
        panic!("expected v1 simulator");
    };
    let annotations = sim.annotations.as_ref().unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].label, "kept");
    assert!(!lesson.has_errors());
    assert!(lesson.diagnostics[0].message.contains("entry 0 skipped"));
}

#[test]
fn required_payload_of_the_wrong_shape_is_not_called_invalid_json() {
    let source = ":::trading-sim\n[scenario_data]\n{\"current\": \"high\"}\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    let ContentNode::Malformed(block) = &lesson.blocks[0].node else {
        panic!("expected malformed block");
    };
    assert!(matches!(block.error, BlockError::PayloadShape { .. }));
    assert!(block.error.to_string().starts_with("unexpected shape in [scenario_data]"));
}

#[test]
fn trading_sim_v2_context_alias_and_defaults() {
    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[educational_context]\nBackground\n:::";
    let ContentNode::TradingSimV2(sim) = single(source) else {
        panic!("expected v2 simulator");
    };
    assert_eq!(sim.context, Some(ScenarioContext::Text("Background".into())));
    assert_eq!(sim.actions, defaults::TRADE_ACTIONS);
    assert_eq!(sim.chart_kind, defaults::CHART_KIND);
    assert_eq!(sim.timeframe, defaults::TIMEFRAME);
    assert!(sim.hints.is_empty());
    assert_eq!(sim.entry(), 1.0);
    assert_eq!(sim.feedback_for(TradeAction::Skip), defaults::FEEDBACK_SKIP);
}

#[test]
fn trading_sim_v2_unknown_attributes_and_sections_warn() {
    let source = ":::trading-sim v=\"2\" chart=\"radar\" actions=\"yolo,skip\"\n[dataset]\n{\"current\": 1.0}\n[mystery]\n??\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    let ContentNode::TradingSimV2(sim) = &lesson.blocks[0].node else {
        panic!("expected v2 simulator");
    };
    assert_eq!(sim.chart_kind, ChartKind::Line);
    assert_eq!(sim.actions, [TradeAction::Skip]);
    assert_eq!(lesson.diagnostics.len(), 3);
    assert!(!lesson.has_errors());
    assert!(lesson.diagnostics.iter().any(|d| d.message.contains("[mystery]")));
}

#[test]
fn malformed_json_is_contained() {
    let source = format!(
        ":::trading-sim\n[scenario_data]\n{{\"current\": 1.0,}}\n:::\n\nBetween\n\n{}",
        V1_SIM
    );
    let lesson = Parser::new(source, 0).parse();
    let kinds: Vec<&str> = lesson.nodes().map(|n| n.kind_name()).collect();
    assert_eq!(kinds, ["malformed", "prose", "trading-sim-v1"]);
    assert!(lesson.has_errors());

    let ContentNode::Malformed(block) = &lesson.blocks[0].node else {
        unreachable!()
    };
    match &block.error {
        BlockError::PayloadDecode { section, raw, .. } => {
            assert_eq!(section, "scenario_data");
            assert_eq!(raw, "{\"current\": 1.0,}");
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn malformed_optional_json_section_fails_block() {
    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[rubric]\n{direction: 1}\n:::";
    assert!(matches!(single(source), ContentNode::Malformed(_)));
}

// ---------------------------------------------------------------------------
// Hints
// ---------------------------------------------------------------------------

fn hint(id: &str, text: &str) -> Hint {
    Hint {
        id: id.into(),
        text: text.into(),
    }
}

#[test]
fn hint_spellings_normalize_identically() {
    let strings = normalize_hints(r#"["Check the trend", "Mind the spread"]"#).unwrap();
    let objects = normalize_hints(r#"[{"text": "Check the trend"}, {"text": "Mind the spread"}]"#).unwrap();
    let bullets = normalize_hints("- Check the trend\n- Mind the spread").unwrap();

    let expected = vec![hint("hint-1", "Check the trend"), hint("hint-2", "Mind the spread")];
    assert_eq!(strings.0, expected);
    assert_eq!(objects.0, expected);
    assert_eq!(bullets.0, expected);
    assert!(strings.1.is_empty() && objects.1.is_empty() && bullets.1.is_empty());
}

#[test]
fn hint_objects_keep_their_ids() {
    let (hints, _) = normalize_hints(r#"[{"id": "trend", "text": "A"}, {"id": 7, "text": "B"}]"#).unwrap();
    assert_eq!(hints, vec![hint("trend", "A"), hint("7", "B")]);
}

#[test]
fn hints_that_are_not_a_list_default_to_empty() {
    let (hints, warnings) = normalize_hints(r#"{"text": "nope"}"#).unwrap();
    assert!(hints.is_empty());
    assert_eq!(warnings, vec![ShapeWarning::NotAList { found: "an object" }]);

    let (hints, warnings) = normalize_hints(r#"["ok", 3, {"id": "x"}]"#).unwrap();
    assert_eq!(hints, vec![hint("hint-1", "ok")]);
    assert_eq!(warnings.len(), 2);
}

#[test]
fn scalar_and_plain_text_hints_are_not_a_list() {
    for (raw, found) in [("42", "a number"), ("true", "a boolean"), ("\"tip\"", "a string")] {
        let (hints, warnings) = normalize_hints(raw).unwrap();
        assert!(hints.is_empty(), "{raw}");
        assert_eq!(warnings, vec![ShapeWarning::NotAList { found }]);
    }

    let (hints, warnings) = normalize_hints("Look at the volume").unwrap();
    assert!(hints.is_empty());
    assert_eq!(warnings, vec![ShapeWarning::NotAList { found: "plain text" }]);
}

#[test]
fn hints_invalid_json_is_a_decode_error() {
    assert!(matches!(
        normalize_hints("[\"unterminated"),
        Err(BlockError::PayloadDecode { .. })
    ));
}

#[test]
fn hints_shape_warning_reaches_diagnostics() {
    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[hints]\n42\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    let ContentNode::TradingSimV2(sim) = &lesson.blocks[0].node else {
        panic!("expected v2 simulator");
    };
    assert!(sim.hints.is_empty());
    assert_eq!(lesson.diagnostics.len(), 1);
    assert!(lesson.diagnostics[0].message.contains("found a number"));

    let source = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[hints]\n{\"a\": 1}\n:::";
    let lesson = Parser::new(source.to_string(), 0).parse();
    let ContentNode::TradingSimV2(sim) = &lesson.blocks[0].node else {
        panic!("expected v2 simulator");
    };
    assert!(sim.hints.is_empty());
    assert_eq!(lesson.diagnostics.len(), 1);
    assert!(lesson.diagnostics[0].message.contains("must be a list"));
}

// ---------------------------------------------------------------------------
// Re-serialization
// ---------------------------------------------------------------------------

#[test]
fn reserialized_nodes_parse_back_equivalent() {
    let source = format!(
        ":::meta level=\"intermediate\" duration=\"15 min\" tags=\"forex,trend\" id=\"l-7\"\n:::\n\
         # Pullbacks\n\nIntro text.\n\n\
         :::step title=\"One\"\nStep body\n:::\n\
         :::callout type=\"danger\"\nCareful\n:::accordion\n## X\nY\n:::\n:::\n\
         :::tabs\n[label=\"A\"]\nalpha\n[label=\"B\"]\nbeta\n:::\n\
         :::flipcard\n[front]\nQ\n:::\n\
         {}\n\n{}\n\nOutro.",
        V1_SIM, V2_SIM
    );
    let first = tokenize(&source);
    assert_eq!(first.len(), 9);
    let second = tokenize(&to_markup(&first));
    assert_eq!(first, second);
}

#[test]
fn reserialized_hints_are_canonical() {
    let strings = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[hints]\n[\"a\", \"b\"]\n:::";
    let objects = ":::trading-sim v=\"2\"\n[dataset]\n{\"current\": 1.0}\n[hints]\n[{\"id\": \"hint-1\", \"text\": \"a\"}, {\"text\": \"b\"}]\n:::";
    let from_strings = tokenize(strings);
    let from_objects = tokenize(objects);
    assert_eq!(from_strings, from_objects);
    assert_eq!(tokenize(&to_markup(&from_strings)), from_objects);
}

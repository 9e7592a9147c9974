//! Headless mode for the dice pipeline.
//!
//! A simple line protocol over stdin/stdout, designed for scripted testing:
//! - Lines starting with `#` are commands (place, item, choose, save, ...)
//! - Any other line is a landed roll: `<slot> <face>`
//! - Output lines are tagged (`[ROLL]`, `[CHOICE]`, `[ERROR]`, ...)

use anyhow::{anyhow, bail, Context, Result};
use dice_core::catalog::{find_effect, standard_effects};
use dice_core::coordinator::ChannelPrompt;
use dice_core::pipeline::{ChannelListener, CompletedRoll};
use dice_core::{
    Correction, DecisionRequest, DieType, Effect, HeldItem, Landing, Persona, PhysicsDriver,
    PipelineConfig, RollOutcome, RollPipeline, RollTable, RolledDie, SlotId,
};
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// What the caller should do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Output(Vec<String>),
    Quit,
}

/// Run the pipeline in headless mode until `#quit` or end of input.
pub async fn run_headless(config: PipelineConfig) -> Result<()> {
    let mut session = Session::new(config);

    println!("=== Dice Headless Mode ===");
    for line in help_lines() {
        println!("{line}");
    }
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("error reading input")?;
        match session.handle(&line).await {
            Step::Quit => {
                println!("Goodbye!");
                break;
            }
            Step::Output(lines) => {
                for out in lines {
                    println!("{out}");
                }
            }
        }
        stdout.flush().ok();
    }

    Ok(())
}

/// A table, its pipeline and the popup/completion feeds.
pub struct Session {
    table: RollTable,
    pipeline: RollPipeline<ChannelPrompt, ChannelListener>,
    requests: UnboundedReceiver<DecisionRequest>,
    completed: UnboundedReceiver<CompletedRoll>,
    /// Placed slots in placement order; users address them 1-based.
    slots: Vec<SlotId>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        let (prompt, requests) = ChannelPrompt::channel();
        let (listener, completed) = ChannelListener::channel();
        Self {
            table: RollTable::new(),
            pipeline: RollPipeline::new(config, prompt, listener),
            requests,
            completed,
            slots: Vec::new(),
        }
    }

    /// Handle one input line.
    pub async fn handle(&mut self, line: &str) -> Step {
        let line = line.trim();
        if line.is_empty() {
            return Step::Output(Vec::new());
        }

        let result = if let Some(command) = line.strip_prefix('#') {
            let (name, rest) = command
                .split_once(char::is_whitespace)
                .unwrap_or((command, ""));
            if matches!(name, "quit" | "exit") {
                return Step::Quit;
            }
            self.command(name, rest.trim()).await
        } else {
            self.roll(line)
        };

        let mut lines = match result {
            Ok(lines) => lines,
            Err(e) => vec![format!("[ERROR] {e:#}")],
        };
        self.drain_feeds(&mut lines);
        Step::Output(lines)
    }

    async fn command(&mut self, name: &str, rest: &str) -> Result<Vec<String>> {
        debug!(command = name, args = rest, "Headless command");
        let args: Vec<&str> = rest.split_whitespace().collect();
        match name {
            "place" => self.place(rest),
            "remove" => {
                let index = self.slot_index(args.first().copied())?;
                let slot = self.slots.remove(index);
                self.table.remove(slot);
                self.pipeline.clear_slot(slot);
                Ok(vec![format!("[REMOVED] #{}", index + 1)])
            }
            "item" => {
                let (quantity, effect_name) = match args.first().and_then(|a| a.parse::<u32>().ok()) {
                    Some(quantity) => (quantity, rest[args[0].len()..].trim()),
                    None => (1, rest),
                };
                let effect = lookup(effect_name)?;
                let item = HeldItem::new(effect.name.clone())
                    .with_quantity(quantity)
                    .with_effect(effect);
                let line = format!("[ITEM] {} x{}", item.name, item.quantity);
                self.table.add_item(item);
                Ok(vec![line])
            }
            "drop" => {
                if self.table.set_item_quantity(rest, 0) {
                    Ok(vec![format!("[ITEM] {rest} x0")])
                } else {
                    bail!("no held item named {rest:?}")
                }
            }
            "persona" => self.persona(rest),
            "buff" => {
                let effect = lookup(rest)?;
                let line = format!("[BUFF] {}", effect.name);
                self.table.grant_buff(effect);
                Ok(vec![line])
            }
            "effects" => Ok(standard_effects()
                .iter()
                .map(|e| format!("  {:<13} {:?}: {}", e.name, e.alignment, e.description))
                .collect()),
            "range" => {
                let slot = self.slot(args.first().copied())?;
                let range = self
                    .pipeline
                    .legal_range(&self.table, slot)
                    .ok_or_else(|| anyhow!("slot has no die"))?;
                let faces: Vec<String> = range.faces().map(|f| f.to_string()).collect();
                Ok(vec![format!("[RANGE] {range} faces: {}", faces.join(" "))])
            }
            "preview" => {
                let slot = self.slot(args.first().copied())?;
                let raw = face_arg(args.get(1).copied())?;
                let value = self
                    .pipeline
                    .preview(&self.table, slot, raw)
                    .ok_or_else(|| anyhow!("slot has no die"))?;
                Ok(vec![format!("[PREVIEW] {raw} -> {value}")])
            }
            "air" => {
                let slot = self.slot(args.first().copied())?;
                let face = face_arg(args.get(1).copied())?;
                let mut physics = ConsolePhysics::new(&self.slots);
                let correction = self.pipeline.mid_air(&self.table, slot, face, &mut physics);
                let mut lines = physics.lines;
                lines.push(match correction {
                    Correction::NotNeeded => "[AIR] on course".to_string(),
                    Correction::SteerTo(target) => format!("[AIR] steering {face} -> {target}"),
                    Correction::Impossible => "[AIR] no legal face".to_string(),
                });
                Ok(lines)
            }
            "land" => {
                let slot = self.slot(args.first().copied())?;
                let face = face_arg(args.get(1).copied())?;
                let mut physics = ConsolePhysics::new(&self.slots);
                let landing = self
                    .pipeline
                    .land(&mut self.table, slot, face, &mut physics)?;
                let mut lines = physics.lines;
                match landing {
                    Landing::Snapping(target) => {
                        lines.push(format!("[LAND] snapping {face} -> {target}, report the new face"))
                    }
                    Landing::Resolved(outcome) => lines.extend(outcome_lines(&outcome)),
                }
                Ok(lines)
            }
            "choose" => {
                let slot = self.slot(args.first().copied())?;
                let option: usize = args
                    .get(1)
                    .ok_or_else(|| anyhow!("usage: #choose <slot> <option>"))?
                    .parse()
                    .context("option must be a number")?;
                let index = option
                    .checked_sub(1)
                    .ok_or_else(|| anyhow!("options are numbered from 1"))?;
                self.pipeline.submit_choice(slot, index)?;
                Ok(Vec::new())
            }
            "abandon" => {
                let slot = self.slot(args.first().copied())?;
                self.pipeline.abandon_decision(slot)?;
                Ok(Vec::new())
            }
            "turn" => {
                if let Some(turn) = args.first() {
                    let turn = turn.parse().context("turn must be a number")?;
                    self.pipeline.set_turn(turn);
                }
                Ok(vec![format!("[TURN] {}", self.pipeline.turn())])
            }
            "status" => Ok(self.status()),
            "save" => {
                let path = args.first().ok_or_else(|| anyhow!("usage: #save <path>"))?;
                self.table.save(path).await.context("save failed")?;
                Ok(vec![format!("[SAVED] Table saved to {path}")])
            }
            "load" => {
                let path = args.first().ok_or_else(|| anyhow!("usage: #load <path>"))?;
                let table = RollTable::load(path).await.context("load failed")?;
                for slot in self.slots.drain(..) {
                    self.pipeline.clear_slot(slot);
                }
                self.slots = table.slots().collect();
                self.slots.sort_by_key(|slot| slot.0);
                self.table = table;
                Ok(vec![format!(
                    "[LOADED] Table loaded from {path} ({} dice)",
                    self.slots.len()
                )])
            }
            "help" => Ok(help_lines()),
            _ => bail!("unknown command #{name}. Type #help for help."),
        }
    }

    /// `<slot> <face>`: resolve a landed face with no physics correction.
    fn roll(&mut self, line: &str) -> Result<Vec<String>> {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.len() != 2 {
            bail!("expected `<slot> <face>` or a #command");
        }
        let slot = self.slot(Some(args[0]))?;
        let face = face_arg(Some(args[1]))?;
        let outcome = self.pipeline.resolve(&mut self.table, slot, face)?;
        Ok(outcome_lines(&outcome))
    }

    fn place(&mut self, rest: &str) -> Result<Vec<String>> {
        let (notation, effect_list) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        if notation.is_empty() {
            bail!("usage: #place <die> [effect, effect, ...]");
        }
        let die: DieType = notation.parse()?;
        let effects = parse_effects(effect_list)?;
        let names: Vec<String> = effects.iter().map(|e| e.name.clone()).collect();

        let mut rolled = RolledDie::new(die);
        rolled.effects = effects;
        let slot = self.table.place(rolled);
        self.slots.push(slot);

        let mut line = format!("[PLACED] #{} {die}", self.slots.len());
        if !names.is_empty() {
            line.push_str(&format!(" ({})", names.join(", ")));
        }
        Ok(vec![line])
    }

    /// `#persona <name>: effect, ...` or `#persona clear`.
    fn persona(&mut self, rest: &str) -> Result<Vec<String>> {
        if rest.eq_ignore_ascii_case("clear") {
            return Ok(match self.table.clear_persona() {
                Some(old) => vec![format!("[PERSONA] {} left", old.name)],
                None => vec!["[PERSONA] none".to_string()],
            });
        }
        let (name, effect_list) = rest.split_once(':').unwrap_or((rest, ""));
        let name = name.trim();
        if name.is_empty() {
            bail!("usage: #persona <name>: effect, ... | #persona clear");
        }
        let mut persona = Persona::new(name);
        persona.effects = parse_effects(effect_list)?;
        let line = format!("[PERSONA] {} ({} effects)", persona.name, persona.effects.len());
        self.table.set_persona(persona);
        Ok(vec![line])
    }

    fn status(&self) -> Vec<String> {
        let mut lines = vec![
            "[STATUS]".to_string(),
            format!("  Turn: {}", self.pipeline.turn()),
        ];
        if let Some(previous) = self.pipeline.previous_final() {
            lines.push(format!("  Previous roll: {previous}"));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(die) = self.table.die(*slot) else {
                continue;
            };
            let mut line = format!("  #{} {}", i + 1, die.die);
            if let Some(record) = self.pipeline.record(*slot) {
                line.push_str(&format!(
                    " last {} -> {}",
                    record.base_roll, record.final_roll
                ));
            }
            if self.pipeline.pending_decision(*slot).is_some() {
                line.push_str(" [awaiting choice]");
            }
            lines.push(line);
        }
        for item in self.table.items() {
            lines.push(format!("  Item: {} x{}", item.name, item.quantity));
        }
        if let Some(persona) = self.table.persona() {
            lines.push(format!("  Persona: {}", persona.name));
        }
        for buff in self.table.buffs() {
            lines.push(format!("  Buff: {}", buff.name));
        }
        lines
    }

    /// Print popups and completions queued by the last operation.
    fn drain_feeds(&mut self, lines: &mut Vec<String>) {
        while let Ok(request) = self.requests.try_recv() {
            let number = self.slot_number(request.slot);
            lines.push(format!("[CHOICE] #{number} {}: {}", request.effect, request.prompt));
            for (i, option) in request.options.iter().enumerate() {
                lines.push(format!("  {}. {}", i + 1, option.label));
            }
        }
        while let Ok(done) = self.completed.try_recv() {
            let number = self.slot_number(done.slot);
            lines.push(format!(
                "[ROLL] #{number} {} -> {}",
                done.record.base_roll, done.record.final_roll
            ));
        }
    }

    fn slot_index(&self, arg: Option<&str>) -> Result<usize> {
        let number: usize = arg
            .ok_or_else(|| anyhow!("missing slot number"))?
            .parse()
            .context("slot must be a number")?;
        if number == 0 || number > self.slots.len() {
            bail!("no slot #{number} ({} placed)", self.slots.len());
        }
        Ok(number - 1)
    }

    fn slot(&self, arg: Option<&str>) -> Result<SlotId> {
        Ok(self.slots[self.slot_index(arg)?])
    }

    fn slot_number(&self, slot: SlotId) -> String {
        slot_label(&self.slots, slot)
    }
}

/// Physics driver that reports instructions as output lines.
struct ConsolePhysics<'a> {
    slots: &'a [SlotId],
    lines: Vec<String>,
}

impl<'a> ConsolePhysics<'a> {
    fn new(slots: &'a [SlotId]) -> Self {
        Self {
            slots,
            lines: Vec::new(),
        }
    }
}

impl PhysicsDriver for ConsolePhysics<'_> {
    fn steer_toward(&mut self, slot: SlotId, face: i32) {
        let label = slot_label(self.slots, slot);
        self.lines.push(format!("[STEER] #{label} toward {face}"));
    }

    fn snap_to(&mut self, slot: SlotId, face: i32) {
        let label = slot_label(self.slots, slot);
        self.lines.push(format!("[SNAP] #{label} to {face}"));
    }
}

fn slot_label(slots: &[SlotId], slot: SlotId) -> String {
    slots
        .iter()
        .position(|s| *s == slot)
        .map(|i| (i + 1).to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn outcome_lines(outcome: &RollOutcome) -> Vec<String> {
    match outcome {
        // Completions are printed from the listener feed.
        RollOutcome::Completed(_) => Vec::new(),
        RollOutcome::AwaitingChoice(_) => vec!["[WAITING] choose with #choose <slot> <option>".to_string()],
    }
}

fn lookup(name: &str) -> Result<Effect> {
    find_effect(name).ok_or_else(|| anyhow!("unknown effect {name:?}. Type #effects for the list."))
}

fn parse_effects(list: &str) -> Result<Vec<Effect>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(lookup)
        .collect()
}

fn face_arg(arg: Option<&str>) -> Result<i32> {
    arg.ok_or_else(|| anyhow!("missing face"))?
        .parse()
        .context("face must be a number")
}

fn help_lines() -> Vec<String> {
    [
        "Commands:",
        "  <slot> <face>              - Resolve a landed face",
        "  #place <die> [effects]     - Place a die, e.g. #place d6 Weighted, Lucky Coin",
        "  #remove <slot>             - Take a die out of play",
        "  #item [qty] <effect>       - Hold an item carrying a catalogue effect",
        "  #drop <item>               - Set an item's quantity to zero",
        "  #persona <name>: effects   - Set the persona (#persona clear to remove)",
        "  #buff <effect>             - Grant a one-shot buff",
        "  #effects                   - List catalogue effects",
        "  #range <slot>              - Show the legal face range",
        "  #preview <slot> <face>     - Show the resolved value without rolling",
        "  #air <slot> <face>         - Report an airborne die's projected face",
        "  #land <slot> <face>        - Report a landed face with physics correction",
        "  #choose <slot> <option>    - Answer a pending decision",
        "  #abandon <slot>            - Drop a pending decision",
        "  #turn [n]                  - Show or set the turn",
        "  #status                    - Show table status",
        "  #save <path> / #load <path>",
        "  #help / #quit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(step: Step) -> Vec<String> {
        match step {
            Step::Output(lines) => lines,
            Step::Quit => panic!("unexpected quit"),
        }
    }

    fn session() -> Session {
        Session::new(PipelineConfig::new().with_seed(7))
    }

    #[tokio::test]
    async fn test_place_and_roll() {
        let mut session = session();
        let placed = output(session.handle("#place d6 Weighted, Lucky Coin").await);
        assert_eq!(placed, vec!["[PLACED] #1 d6 (Weighted, Lucky Coin)"]);

        let range = output(session.handle("#range 1").await);
        assert_eq!(range, vec!["[RANGE] [3, 6] faces: 3 4 5 6"]);

        let rolled = output(session.handle("1 4").await);
        assert_eq!(rolled, vec!["[ROLL] #1 4 -> 5"]);
    }

    #[tokio::test]
    async fn test_decision_round_trip() {
        let mut session = session();
        output(session.handle("#place d6").await);
        output(session.handle("#buff Nudge").await);

        let lines = output(session.handle("1 3").await);
        assert!(lines[0].starts_with("[WAITING]"));
        assert!(lines[1].starts_with("[CHOICE] #1 Nudge"));
        assert_eq!(&lines[2..], ["  1. Lower: 2", "  2. Keep: 3", "  3. Raise: 4"]);

        let lines = output(session.handle("1 5").await);
        assert!(lines[0].starts_with("[ERROR]"));

        let lines = output(session.handle("#choose 1 3").await);
        assert_eq!(lines, vec!["[ROLL] #1 3 -> 4"]);
    }

    #[tokio::test]
    async fn test_land_snaps() {
        let mut session = session();
        output(session.handle("#place d20 Feather Core").await);
        let lines = output(session.handle("#land 1 4").await);
        assert_eq!(lines[0], "[SNAP] #1 to 11");
        let lines = output(session.handle("#land 1 11").await);
        assert_eq!(lines, vec!["[ROLL] #1 11 -> 11"]);
    }

    #[tokio::test]
    async fn test_errors_and_quit() {
        let mut session = session();
        let lines = output(session.handle("#place d7").await);
        assert!(lines[0].starts_with("[ERROR]"));
        let lines = output(session.handle("#buff Nonexistent").await);
        assert!(lines[0].contains("unknown effect"));
        let lines = output(session.handle("2 4").await);
        assert!(lines[0].contains("no slot #2"));
        let lines = output(session.handle("#frobnicate").await);
        assert!(lines[0].contains("unknown command"));
        assert_eq!(session.handle("#quit").await, Step::Quit);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let path = path.to_string_lossy();

        let mut session = session();
        output(session.handle("#place d8 Even Keel").await);
        output(session.handle("#item 2 Lucky Coin").await);
        let saved = output(session.handle(&format!("#save {path}")).await);
        assert!(saved[0].starts_with("[SAVED]"));

        let mut restored = Session::new(PipelineConfig::new());
        let loaded = output(restored.handle(&format!("#load {path}")).await);
        assert!(loaded[0].ends_with("(1 dice)"));
        let lines = output(restored.handle("1 4").await);
        assert_eq!(lines, vec!["[ROLL] #1 4 -> 5"]);
    }
}

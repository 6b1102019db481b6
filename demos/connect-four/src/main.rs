//! Connect Four, hosted as one `GameInstance` kind on an Arcforge server.
//!
//! Two seats, turn-based, optionally best-of-N. A seat can be a human
//! (filled by `join`) or a bot that always plays through the same
//! `NpcSupport` plumbing a human seat would use — the coordinator never
//! knows the difference.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arcforge::prelude::*;
use serde_json::{json, Value};

const ROWS: usize = 6;
const COLS: usize = 7;

static NEXT_NPC_ID: AtomicU64 = AtomicU64::new(1 << 40);

fn next_npc_id() -> PlayerId {
    PlayerId(NEXT_NPC_ID.fetch_add(1, Ordering::Relaxed))
}

/// A bot that always drops in the same column — the "dumbest possible"
/// opponent, useful as a stand-in for a real policy and as a
/// deterministic fixture in tests.
struct FixedColumn(usize);

impl NpcPolicy for FixedColumn {
    fn decide(&self, _state: &Value) -> Value {
        json!(self.0)
    }
}

/// Parses a drop action, which may arrive as a JSON number or a numeric
/// string, into a column index within bounds.
fn parse_column(action: &Action, cols: usize) -> Option<usize> {
    let n = if let Some(i) = action.0.as_i64() {
        i
    } else if let Some(s) = action.0.as_str() {
        s.parse::<i64>().ok()?
    } else {
        return None;
    };
    if n < 0 || n as usize >= cols {
        None
    } else {
        Some(n as usize)
    }
}

fn seat_kind(params: &Value, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("human")
        .to_string()
}

pub struct ConnectFourGame {
    rows: usize,
    cols: usize,
    board: Vec<u8>,
    heights: Vec<u8>,
    players: Vec<PlayerId>,
    spectators: Vec<PlayerId>,
    token_of: HashMap<PlayerId, u8>,
    turns: Option<TurnSupport>,
    turn_taken: bool,
    pending: Option<QueuedAction>,
    npc: NpcSupport,
    active: bool,
    winner: Option<PlayerId>,
    num_games: u32,
    games_played: u32,
    wins: HashMap<PlayerId, u32>,
    turn_timeout: Duration,
    fps: u32,
}

impl ConnectFourGame {
    pub fn new(params: Value) -> Result<Self, CoreError> {
        let num_games = params
            .get("num_games")
            .and_then(Value::as_u64)
            .unwrap_or(1)
            .max(1) as u32;
        let turn_timeout_secs = params
            .get("turn_timeout_secs")
            .and_then(Value::as_f64)
            .unwrap_or(30.0);
        let fps = params.get("fps").and_then(Value::as_u64).unwrap_or(5) as u32;
        let ticks_per_ai_action = params
            .get("ticks_per_ai_action")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;

        let mut game = ConnectFourGame {
            rows: ROWS,
            cols: COLS,
            board: vec![0; ROWS * COLS],
            heights: vec![0; COLS],
            players: Vec::new(),
            spectators: Vec::new(),
            token_of: HashMap::new(),
            turns: None,
            turn_taken: false,
            pending: None,
            npc: NpcSupport::new(ticks_per_ai_action, true),
            active: false,
            winner: None,
            num_games,
            games_played: 0,
            wins: HashMap::new(),
            turn_timeout: Duration::from_secs_f64(turn_timeout_secs.max(0.0)),
            fps,
        };

        for (key, column) in [("player_zero", 0usize), ("player_one", 1usize)] {
            if seat_kind(&params, key) != "human" {
                let id = next_npc_id();
                game.seat(id);
                game.npc.add_npc(id, Arc::new(FixedColumn(column)), json!({}));
            }
        }

        Ok(game)
    }

    fn seat(&mut self, player: PlayerId) {
        let token = self.players.len() as u8 + 1;
        self.players.push(player);
        self.token_of.insert(player, token);
    }

    fn open_columns(&self) -> Vec<usize> {
        (0..self.cols)
            .filter(|&c| (self.heights[c] as usize) < self.rows)
            .collect()
    }

    fn apply_drop(&mut self, player: PlayerId, col: usize) {
        let token = *self.token_of.get(&player).expect("seated player has a token");
        let height = self.heights[col] as usize;
        let row = self.rows - 1 - height;
        self.board[row * self.cols + col] = token;
        self.heights[col] += 1;
        if check_win(&self.board, self.rows, self.cols, row, col, token) {
            self.winner = Some(player);
        }
    }

    fn state_value(&self) -> Value {
        json!({
            "board": self.board,
            "rows": self.rows,
            "cols": self.cols,
            "open_columns": self.open_columns(),
            "active_player_id": self.turns.as_ref().and_then(TurnSupport::current_player).map(|p| p.0),
            "curr_game_number": self.turns.as_ref().map(TurnSupport::curr_game_number).unwrap_or(0),
            "winner": self.winner.map(|p| p.0),
        })
    }

    fn board_full(&self) -> bool {
        self.heights.iter().all(|&h| (h as usize) == self.rows)
    }
}

impl GameInstance for ConnectFourGame {
    fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    fn is_ready(&self) -> bool {
        self.players.len() == 2 && self.npc.has_any_human()
    }

    fn is_empty(&self) -> bool {
        !self.npc.has_any_human() && self.spectators.is_empty()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) {
        if self.turns.is_none() {
            self.turns = Some(TurnSupport::new(&self.players, self.turn_timeout));
        }
        self.active = true;
        let state = self.state_value();
        self.npc.publish_state(&state);
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn is_finished(&self) -> bool {
        self.games_played >= self.num_games
    }

    fn curr_game_over(&self) -> bool {
        self.winner.is_some() || self.board_full()
    }

    fn needs_reset(&self) -> bool {
        self.curr_game_over() && !self.is_finished()
    }

    fn reset(&mut self) {
        self.board.fill(0);
        self.heights.fill(0);
        self.winner = None;
        self.turn_taken = false;
        self.pending = None;
        if let Some(turns) = &mut self.turns {
            turns.start_new_game();
        }
    }

    fn add_player(&mut self, player: PlayerId) -> Result<(), GameError> {
        if self.players.contains(&player) {
            return Err(GameError::InvalidAction("already seated".into()));
        }
        if self.is_full() {
            return Err(GameError::InvalidAction("game is full".into()));
        }
        self.seat(player);
        self.npc.add_human(player);
        Ok(())
    }

    fn add_spectator(&mut self, player: PlayerId) {
        if !self.spectators.contains(&player) {
            self.spectators.push(player);
        }
    }

    fn remove_player(&mut self, player: PlayerId) {
        self.players.retain(|&p| p != player);
        self.npc.remove_human(player);
        self.npc.remove_npc(player);
    }

    fn remove_spectator(&mut self, player: PlayerId) {
        self.spectators.retain(|&p| p != player);
    }

    fn enqueue_action(&mut self, action: QueuedAction) {
        let Some(turns) = &self.turns else { return };
        if self.turn_taken || turns.current_player() != Some(action.player) {
            return;
        }
        let Some(col) = parse_column(&action.action, self.cols) else { return };
        if self.heights[col] as usize >= self.rows {
            return;
        }
        self.pending = Some(QueuedAction {
            player: action.player,
            action: Action::new(json!(col)),
        });
        self.turn_taken = true;
    }

    fn is_valid_action(&self, player: PlayerId, action: &Action) -> bool {
        if !self.active || self.turn_taken {
            return false;
        }
        let Some(turns) = &self.turns else { return false };
        if turns.current_player() != Some(player) {
            return false;
        }
        match parse_column(action, self.cols) {
            Some(col) => (self.heights[col] as usize) < self.rows,
            None => false,
        }
    }

    fn tick(&mut self) -> Result<GameStatus, GameError> {
        if !self.active {
            return Ok(GameStatus::Inactive);
        }

        let mut turns = self.turns.take().expect("active instance has turns");

        if turns.is_timed_out() {
            let heights = self.heights.clone();
            let cols = self.cols;
            if let Some((player, action)) = turns.force_default_action(move |_| {
                let col = (0..cols)
                    .find(|&c| (heights[c] as usize) < ROWS)
                    .unwrap_or(0);
                Action::new(json!(col))
            }) {
                if let Some(col) = parse_column(&action, self.cols) {
                    self.apply_drop(player, col);
                }
            }
        } else if let Some(qa) = self.pending.take() {
            if turns.try_take_turn(qa.player) {
                if let Some(col) = parse_column(&qa.action, self.cols) {
                    self.apply_drop(qa.player, col);
                }
                turns.advance_turn();
            }
        } else if let Some(current) = turns.current_player() {
            if self.npc.is_npc(current) {
                for (player, action) in self.npc.drain_actions(Duration::from_millis(20)) {
                    if player == current && turns.try_take_turn(player) {
                        if let Some(col) = parse_column(&action, self.cols) {
                            self.apply_drop(player, col);
                        }
                        turns.advance_turn();
                        break;
                    }
                }
            }
        }

        self.turn_taken = false;
        self.turns = Some(turns);

        let state = self.state_value();
        self.npc.publish_state(&state);

        if self.curr_game_over() {
            if let Some(winner) = self.winner {
                *self.wins.entry(winner).or_insert(0) += 1;
            }
            self.games_played += 1;
            if self.games_played >= self.num_games {
                Ok(GameStatus::Done)
            } else {
                Ok(GameStatus::Reset)
            }
        } else {
            Ok(GameStatus::Active)
        }
    }

    fn get_state(&self, _recipient: PlayerId) -> Value {
        self.state_value()
    }

    fn get_data(&self) -> Value {
        json!({
            "winner": self.winner.map(|p| p.0),
            "wins": self.wins.iter().map(|(p, n)| (p.0.to_string(), n)).collect::<HashMap<_, _>>(),
            "games_played": self.games_played,
        })
    }

    fn participants(&self) -> Vec<PlayerId> {
        self.players.iter().chain(self.spectators.iter()).copied().collect()
    }

    fn fps(&self) -> u32 {
        self.fps
    }
}

/// Checks whether the disc just placed at `(row, col)` completes a
/// four-in-a-row for `token`, scanning both directions of each of the
/// four axes (horizontal, vertical, and both diagonals).
fn check_win(board: &[u8], rows: usize, cols: usize, row: usize, col: usize, token: u8) -> bool {
    let directions: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
    for (dr, dc) in directions {
        let mut count = 1;
        count += run_length(board, rows, cols, row, col, dr, dc, token);
        count += run_length(board, rows, cols, row, col, -dr, -dc, token);
        if count >= 4 {
            return true;
        }
    }
    false
}

fn run_length(
    board: &[u8],
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
    token: u8,
) -> usize {
    let mut count = 0;
    let mut r = row as isize + dr;
    let mut c = col as isize + dc;
    while r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols {
        if board[r as usize * cols + c as usize] != token {
            break;
        }
        count += 1;
        r += dr;
        c += dc;
    }
    count
}

fn connect_four_kind() -> GameKind {
    GameKind {
        name: "connect_four".to_string(),
        config: GameKindConfig {
            min_players: 1,
            max_players: 2,
            allow_spectators: true,
            fps: 5,
            default_params: json!({"num_games": 1}),
        },
        factory: Box::new(|params| {
            ConnectFourGame::new(params).map(|g| Box::new(g) as Box<dyn GameInstance>)
        }),
    }
}

struct TokenAuth;

impl Authenticator for TokenAuth {
    async fn authenticate(&self, token: &str) -> Result<PlayerId, SessionError> {
        let id: u64 = token
            .parse()
            .map_err(|_| SessionError::AuthFailed("token must be a number".into()))?;
        Ok(PlayerId(id))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("starting connect-four server on 0.0.0.0:8080");

    let server = ArcforgeServerBuilder::new()
        .bind("0.0.0.0:8080")
        .register_kind(connect_four_kind())
        .build(TokenAuth)
        .await?;

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_enqueue(game: &mut ConnectFourGame, player: PlayerId, action: Value) -> bool {
        let action = Action::new(action);
        if game.is_valid_action(player, &action) {
            game.enqueue_action(QueuedAction { player, action });
            true
        } else {
            false
        }
    }

    fn two_player_game(num_games: u32) -> (ConnectFourGame, PlayerId, PlayerId) {
        let mut game = ConnectFourGame::new(json!({"num_games": num_games})).unwrap();
        let p1 = PlayerId(1);
        let p2 = PlayerId(2);
        game.add_player(p1).unwrap();
        game.add_player(p2).unwrap();
        game.activate();
        (game, p1, p2)
    }

    // S1 — two-player turn-based sync.
    #[test]
    fn test_two_player_turn_sync() {
        let (mut game, p1, p2) = two_player_game(2);

        for i in 0..4usize {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            let inactive = if active == p1 { p2 } else { p1 };

            assert!(try_enqueue(&mut game, active, json!(i)));
            assert!(!try_enqueue(&mut game, inactive, json!(i)));
            assert!(!try_enqueue(&mut game, active, json!(i)));

            assert_eq!(game.tick().unwrap(), GameStatus::Active);
        }

        let expected_tokens = [1u8, 2, 1, 2];
        for (col, &token) in expected_tokens.iter().enumerate() {
            assert_eq!(game.board[35 + col], token, "column {col}");
        }
        assert!(game.board.iter().take(35).all(|&c| c == 0));
    }

    // S2 — NPC plays asynchronously alongside a human.
    #[tokio::test]
    async fn test_npc_plays_alongside_human() {
        let mut game = ConnectFourGame::new(json!({
            "player_zero": "npc",
            "num_games": 1,
        }))
        .unwrap();
        let human = PlayerId(2);
        game.add_player(human).unwrap();
        game.activate();

        for turn in 0..4usize {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            if active == human {
                assert!(try_enqueue(&mut game, human, json!(turn / 2)));
            }
            // Give the NPC worker a moment to react to the published state.
            for _ in 0..20 {
                if game.pending.is_some() || game.npc.is_npc(active) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            game.tick().unwrap();
        }

        let nonzero: Vec<(usize, u8)> = game
            .board
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .map(|(i, &v)| (i, v))
            .collect();
        assert_eq!(nonzero, vec![(21, 1), (28, 2), (35, 1), (36, 2)]);
    }

    // S3 — a silent player times out; the watchdog forces a default move
    // and the turn advances instead of stalling the game forever.
    #[test]
    fn test_turn_timeout_watchdog_advances_and_resumes() {
        let mut game = ConnectFourGame::new(json!({
            "num_games": 1,
            "turn_timeout_secs": 0.2,
        }))
        .unwrap();
        let p1 = PlayerId(1);
        let p2 = PlayerId(2);
        game.add_player(p1).unwrap();
        game.add_player(p2).unwrap();
        game.activate();

        for i in 0..2usize {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            assert!(try_enqueue(&mut game, active, json!(i)));
            assert_eq!(game.tick().unwrap(), GameStatus::Active);
        }

        let stalled_player = game.turns.as_ref().unwrap().current_player().unwrap();

        // Let the turn clock run out without enqueuing anything.
        std::thread::sleep(Duration::from_millis(1000));
        assert_eq!(game.tick().unwrap(), GameStatus::Active);

        let new_active = game.turns.as_ref().unwrap().current_player().unwrap();
        assert_ne!(
            new_active, stalled_player,
            "watchdog should force a default move and advance the turn"
        );

        // Ticks resume taking normal enqueued turns afterward.
        assert!(try_enqueue(&mut game, new_active, json!(2)));
        assert_eq!(game.tick().unwrap(), GameStatus::Active);
    }

    // S4 — a full best-of-two series: RESET after the first win, DONE after the second.
    #[test]
    fn test_full_series_completion() {
        let (mut game, _p1, _p2) = two_player_game(2);

        let mut last_status = GameStatus::Active;
        for i in 0..7usize {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            assert!(try_enqueue(&mut game, active, json!(i % 2)));
            last_status = game.tick().unwrap();
        }
        assert_eq!(last_status, GameStatus::Reset);
        assert!(!game.is_finished());

        game.reset();
        game.activate();

        for i in 0..7usize {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            assert!(try_enqueue(&mut game, active, json!(i % 2)));
            last_status = game.tick().unwrap();
        }
        assert_eq!(last_status, GameStatus::Done);
        assert!(game.is_finished());
    }

    // S5 — invalid actions are rejected without mutating board state.
    #[test]
    fn test_invalid_actions_rejected() {
        let (mut game, p1, _p2) = two_player_game(1);

        assert!(try_enqueue(&mut game, p1, json!(0)));
        game.tick().unwrap();

        let active = game.turns.as_ref().unwrap().current_player().unwrap();
        assert!(!try_enqueue(&mut game, active, json!(-1)));
        assert!(!try_enqueue(&mut game, active, json!(COLS)));
        assert!(!try_enqueue(&mut game, active, json!("-2")));
        assert!(!try_enqueue(&mut game, active, json!(COLS.to_string())));
        assert!(try_enqueue(&mut game, active, json!((COLS - 1).to_string())));
        game.tick().unwrap();

        // Fill column 0 to the top, then confirm it's rejected and column 1 still works.
        loop {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            if game.heights[0] as usize >= ROWS {
                break;
            }
            assert!(try_enqueue(&mut game, active, json!(0)));
            game.tick().unwrap();
            if game.curr_game_over() {
                break;
            }
        }
        if game.heights[0] as usize >= ROWS && !game.curr_game_over() {
            let active = game.turns.as_ref().unwrap().current_player().unwrap();
            assert!(!try_enqueue(&mut game, active, json!(0)));
            assert!(try_enqueue(&mut game, active, json!(1)));
        }
    }

    #[test]
    fn test_win_detection_all_axes() {
        let rows = 6;
        let cols = 7;

        let mut board = vec![0u8; rows * cols];
        for c in 0..4 {
            board[5 * cols + c] = 1;
        }
        assert!(check_win(&board, rows, cols, 5, 3, 1));

        let mut board = vec![0u8; rows * cols];
        for r in 2..6 {
            board[r * cols + 0] = 1;
        }
        assert!(check_win(&board, rows, cols, 5, 0, 1));

        let mut board = vec![0u8; rows * cols];
        for i in 0..4 {
            board[(2 + i) * cols + i] = 1;
        }
        assert!(check_win(&board, rows, cols, 5, 3, 1));
    }

    #[test]
    fn test_game_kind_config() {
        let kind = connect_four_kind();
        assert_eq!(kind.name, "connect_four");
        assert_eq!(kind.config.max_players, 2);
    }
}

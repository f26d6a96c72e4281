//! The input state machine.
//!
//! Every branch mutates the game first and then pushes the final value of
//! whatever it touched, so the change-set replays as a plain overwrite.

use jigsaw_protocol::{Change, Input, Owner, PlayerId, Point, ScoreMode, SnapMode};

use crate::{Game, GameError};

/// Where a piece must sit relative to its neighbour, in tiles, for the
/// neighbours top, right, bottom, left.
const NEIGHBOR_OFFSETS: [(f64, f64); 4] = [(0.0, 1.0), (-1.0, 0.0), (0.0, -1.0), (1.0, 0.0)];

impl Game {
    /// Applies one input from `player_id` at time `ts` and returns the
    /// change-set to broadcast.
    ///
    /// # Errors
    /// `PlayerNotFound` if the player was never added. Nothing is mutated
    /// in that case.
    pub fn handle_input(
        &mut self,
        player_id: &PlayerId,
        input: &Input,
        ts: u64,
    ) -> Result<Vec<Change>, GameError> {
        let p = self
            .player_index(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.clone()))?;
        let mut out = Vec::new();

        match input {
            Input::MouseDown { x, y } => self.mouse_down(p, Point::new(*x, *y), ts, &mut out),
            Input::MouseUp { .. } => self.mouse_up(p, ts, &mut out),
            Input::MouseMove { x, y, dx, dy, down } => {
                self.mouse_move(p, Point::new(*x, *y), Point::new(*dx, *dy), *down, ts, &mut out)
            }
            Input::ZoomIn { x, y } | Input::ZoomOut { x, y } => {
                let player = &mut self.players[p];
                player.x = *x;
                player.y = *y;
                player.ts = ts;
                self.push_player(p, &mut out);
            }
            Input::Pan { dx, dy } => {
                let player = &mut self.players[p];
                player.x -= *dx;
                player.y -= *dy;
                player.ts = ts;
                self.push_player(p, &mut out);
            }
            Input::BgColor(value) => {
                let player = &mut self.players[p];
                player.bgcolor = Some(value.clone());
                player.ts = ts;
                self.push_player(p, &mut out);
            }
            Input::PlayerColor(value) => {
                let player = &mut self.players[p];
                player.color = Some(value.clone());
                player.ts = ts;
                self.push_player(p, &mut out);
            }
            Input::PlayerName(value) => {
                let player = &mut self.players[p];
                player.name = Some(value.clone());
                player.ts = ts;
                self.push_player(p, &mut out);
            }
            Input::ConnectionClose => self.release_all(player_id, &mut out),
            Input::Other { .. } => {
                self.players[p].ts = ts;
                self.push_player(p, &mut out);
            }
        }

        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    fn mouse_down(&mut self, p: usize, pos: Point, ts: u64, out: &mut Vec<Change>) {
        self.players[p].d = 1;
        self.players[p].ts = ts;
        self.push_player(p, out);

        let Some(idx) = self.free_piece_at(pos) else {
            return;
        };
        self.puzzle.data.max_z += 1;
        out.push(Change::Data(self.puzzle.data));

        let z = self.puzzle.data.max_z;
        let owner = Owner::Player(self.players[p].id.clone());
        let group = self.grouped_pieces(idx);
        for &i in &group {
            let piece = &mut self.puzzle.pieces[i];
            piece.z = z;
            piece.owner = owner.clone();
        }
        self.push_pieces(&group, out);
    }

    fn mouse_move(&mut self, p: usize, pos: Point, diff: Point, down: bool, ts: u64, out: &mut Vec<Change>) {
        let held = if down { self.first_owned_piece(&self.players[p].id) } else { None };

        // Dragging with nothing in hand pans the camera; the cursor in
        // table space stays put.
        if !down || held.is_some() {
            self.players[p].x = pos.x;
            self.players[p].y = pos.y;
        }
        self.players[p].ts = ts;
        self.push_player(p, out);

        if let Some(idx) = held {
            let group = self.grouped_pieces(idx);
            self.drag(&group, diff);
            self.push_pieces(&group, out);
        }
    }

    fn mouse_up(&mut self, p: usize, ts: u64, out: &mut Vec<Change>) {
        self.players[p].d = 0;
        self.players[p].ts = ts;
        self.push_player(p, out);

        let player_id = self.players[p].id.clone();
        let Some(idx) = self.first_owned_piece(&player_id) else {
            return;
        };

        let group = self.grouped_pieces(idx);
        for &i in &group {
            self.puzzle.pieces[i].owner = Owner::Free;
        }
        self.push_pieces(&group, out);

        let info = &self.puzzle.info;
        let pos = self.puzzle.pieces[idx].pos;
        let final_pos = info.final_pos(idx);
        let can_snap_final = match self.params.snap_mode {
            SnapMode::Normal => true,
            SnapMode::Real => group.iter().any(|&i| info.is_corner(i)),
        };

        if can_snap_final && final_pos.distance(pos) < info.snap_distance {
            self.translate(&group, final_pos.sub(pos));
            self.finish(&group);
            self.push_pieces(&group, out);

            self.players[p].points += match self.params.score_mode {
                ScoreMode::Final => group.len() as u64,
                ScoreMode::Any => 1,
            };
            self.push_player(p, out);
            self.mark_finished_if_done(ts, out);
            out.push(Change::Snap(player_id));
            return;
        }

        // Only one merge per release: the first piece/neighbour pair in
        // range wins, even if more are in range.
        let mut snapped = false;
        'pieces: for &i in &group {
            let neighbors = self.puzzle.info.neighbors(i);
            for (other, offset) in neighbors.into_iter().zip(NEIGHBOR_OFFSETS) {
                let Some(other) = other else { continue };
                if self.snap_to_neighbor(i, other, offset, out) {
                    snapped = true;
                    break 'pieces;
                }
            }
        }
        if !snapped {
            return;
        }

        match self.params.score_mode {
            ScoreMode::Any => {
                self.players[p].points += 1;
                self.push_player(p, out);
            }
            ScoreMode::Final => {
                // Only the dragged pieces are newly finished; the rest of
                // the merged group was scored when it reached its place.
                if self.puzzle.pieces[idx].owner.is_finished() {
                    self.players[p].points += group.len() as u64;
                    self.push_player(p, out);
                }
            }
        }
        self.mark_finished_if_done(ts, out);
        out.push(Change::Snap(player_id));
    }

    /// Releases every piece the player holds, without reassigning them.
    fn release_all(&mut self, player_id: &PlayerId, out: &mut Vec<Change>) {
        let held: Vec<usize> = self
            .puzzle
            .pieces
            .iter()
            .filter(|piece| piece.owner.is_player(player_id))
            .map(|piece| piece.idx)
            .collect();
        for &i in &held {
            self.puzzle.pieces[i].owner = Owner::Free;
        }
        self.push_pieces(&held, out);
    }

    // -----------------------------------------------------------------------
    // Snapping and grouping
    // -----------------------------------------------------------------------

    /// Tries to attach `idx`'s group to `other`. `offset` is where `idx`
    /// must sit relative to `other`, in tiles.
    fn snap_to_neighbor(&mut self, idx: usize, other: usize, offset: (f64, f64), out: &mut Vec<Change>) -> bool {
        if self.are_grouped(idx, other) {
            return false;
        }
        let tile = self.puzzle.info.tile();
        let pos = self.puzzle.pieces[idx].pos;
        let dst = self.puzzle.pieces[other]
            .pos
            .add(Point::new(offset.0 * tile, offset.1 * tile));
        if pos.distance(dst) >= self.puzzle.info.snap_distance {
            return false;
        }

        let moving = self.grouped_pieces(idx);
        self.translate(&moving, dst.sub(pos));
        self.group_pieces(idx, other, out);

        let merged = self.grouped_pieces(idx);
        if self.puzzle.pieces[other].owner.is_finished() {
            self.finish(&merged);
        } else {
            let z = merged
                .iter()
                .map(|&i| self.puzzle.pieces[i].z)
                .max()
                .unwrap_or_default();
            for &i in &merged {
                self.puzzle.pieces[i].z = z;
            }
        }
        self.push_pieces(&merged, out);
        true
    }

    /// Puts `a` and `b` and everything already grouped with either of
    /// them into one group. An existing id is reused (a's first); a new
    /// one is drawn from `max_group` only when both are ungrouped.
    fn group_pieces(&mut self, a: usize, b: usize, out: &mut Vec<Change>) {
        let g1 = self.puzzle.pieces[a].group;
        let g2 = self.puzzle.pieces[b].group;
        let group = if g1 != 0 {
            g1
        } else if g2 != 0 {
            g2
        } else {
            self.puzzle.data.max_group += 1;
            out.push(Change::Data(self.puzzle.data));
            self.puzzle.data.max_group
        };

        for piece in &mut self.puzzle.pieces {
            let in_source = piece.group != 0 && (piece.group == g1 || piece.group == g2);
            if piece.idx == a || piece.idx == b || in_source {
                piece.group = group;
            }
        }
    }

    fn are_grouped(&self, a: usize, b: usize) -> bool {
        let g = self.puzzle.pieces[a].group;
        g != 0 && g == self.puzzle.pieces[b].group
    }

    /// The piece itself if ungrouped, else its whole group in index order.
    fn grouped_pieces(&self, idx: usize) -> Vec<usize> {
        let group = self.puzzle.pieces[idx].group;
        if group == 0 {
            return vec![idx];
        }
        self.puzzle
            .pieces
            .iter()
            .filter(|p| p.group == group)
            .map(|p| p.idx)
            .collect()
    }

    fn finish(&mut self, idxs: &[usize]) {
        for &i in idxs {
            let piece = &mut self.puzzle.pieces[i];
            piece.owner = Owner::Finished;
            piece.z = 1;
        }
    }

    fn mark_finished_if_done(&mut self, ts: u64, out: &mut Vec<Change>) {
        if self.puzzle.data.finished == 0 && self.finished_piece_count() == self.piece_count() {
            self.puzzle.data.finished = ts;
            out.push(Change::Data(self.puzzle.data));
            tracing::info!(game_id = %self.id, "puzzle finished");
        }
    }

    // -----------------------------------------------------------------------
    // Lookup and movement
    // -----------------------------------------------------------------------

    /// Highest-z free piece whose tile box contains `pos`; on equal z the
    /// lowest index wins.
    fn free_piece_at(&self, pos: Point) -> Option<usize> {
        let info = &self.puzzle.info;
        let mut best: Option<(i64, usize)> = None;
        for piece in &self.puzzle.pieces {
            if !piece.owner.is_free() || !info.piece_rect(piece.pos).contains(pos) {
                continue;
            }
            if best.is_none_or(|(z, _)| piece.z > z) {
                best = Some((piece.z, piece.idx));
            }
        }
        best.map(|(_, idx)| idx)
    }

    fn first_owned_piece(&self, player_id: &PlayerId) -> Option<usize> {
        self.puzzle
            .pieces
            .iter()
            .position(|p| p.owner.is_player(player_id))
    }

    /// Moves a group by `diff`, shortened so that no piece's tile box
    /// leaves the table bounds.
    fn drag(&mut self, idxs: &[usize], diff: Point) {
        let bounds = self.puzzle.info.bounds();
        let tile = self.puzzle.info.tile();
        let mut d = diff;
        for &i in idxs {
            let pos = self.puzzle.pieces[i].pos;
            if pos.x + d.x < bounds.x {
                d.x = bounds.x - pos.x;
            } else if pos.x + tile + d.x > bounds.x + bounds.w {
                d.x = bounds.x + bounds.w - tile - pos.x;
            }
            if pos.y + d.y < bounds.y {
                d.y = bounds.y - pos.y;
            } else if pos.y + tile + d.y > bounds.y + bounds.h {
                d.y = bounds.y + bounds.h - tile - pos.y;
            }
        }
        self.translate(idxs, d);
    }

    fn translate(&mut self, idxs: &[usize], diff: Point) {
        for &i in idxs {
            let piece = &mut self.puzzle.pieces[i];
            piece.pos = piece.pos.add(diff);
        }
    }

    fn push_pieces(&self, idxs: &[usize], out: &mut Vec<Change>) {
        out.extend(idxs.iter().map(|&i| Change::Piece(self.puzzle.pieces[i].clone())));
    }

    fn push_player(&self, p: usize, out: &mut Vec<Change>) {
        out.push(Change::Player(self.players[p].clone()));
    }
}

//! The distributed driver.
//!
//! Each worker replicates the single-process loop over its own shard of the
//! orbit database; newly discovered facets go to the worker owning their hash.
//! Message draining and work strictly alternate within one worker; nothing
//! here is preemptive. Termination is two-phase: a one-shot quiescence notice
//! per worker, then a collective confirmation once every notice (including
//! one's own) has arrived.

use std::time::{Duration, Instant};

use orbitenum::bank::MemoryBank;
use orbitenum::db::DatabaseOrbits;
use orbitenum::decompose::Decomposer;
use orbitenum::driver as serial;
use orbitenum::key::{ROUTING_SEED, face_hash, owner_of};
use orbitenum::{EngineError, EngineResult, RunParams, balinski, sampling};
use orbitmath::{Face, PermGroup, QMatrix};

use crate::comm::Communicator;
use crate::pool::BufferedExchange;
use crate::protocol::{LocalReport, Message, RoutedFace};

/// Rank that receives the final gather.
const ROOT: usize = 0;

/// Provenance marker for faces produced by the initial sampling rather than
/// by a decomposition.
const SEED_ORBIT: u64 = u64::MAX;

/// Runs the distributed enumeration on this worker.
///
/// Facet orbit representatives come back at rank 0 (`Ok(Some(faces))`);
/// every other rank gets `Ok(None)`. All ranks agree on the outcome kind: a
/// run that cannot be certified complete is `RuntimeExhausted` everywhere,
/// with each shard left resumable.
pub fn run_dual_desc_dist<C: Communicator>(
    comm: &C,
    ext: &QMatrix,
    group: &PermGroup,
    params: &RunParams,
) -> EngineResult<Option<Vec<Face>>> {
    serial::check_input(ext, group)?;
    if params.max_runtime.is_none() {
        return Err(EngineError::Fatal(
            "the distributed driver requires a strictly positive runtime budget".to_string(),
        ));
    }
    let (red, _) = ext.column_reduction();
    let store = serial::open_store(params, red.rows(), comm.size(), comm.rank())?;
    let db = DatabaseOrbits::open(group.clone(), store)?;
    let driver = DistributedDriver {
        comm,
        ext: &red,
        bank: MemoryBank::new(params.bank_capacity),
        exchange: BufferedExchange::new(comm.size(), params.max_flying_messages, comm.rank()),
        notices: vec![false; comm.size()],
        sent_notice: false,
        exhausted: false,
        deadline: serial::deadline_from(params),
        params,
        db,
    };
    driver.run()
}

/// All run-scoped distributed state: one instance per rank per run, nothing
/// global.
struct DistributedDriver<'a, C: Communicator> {
    comm: &'a C,
    ext: &'a QMatrix,
    db: DatabaseOrbits,
    bank: MemoryBank,
    exchange: BufferedExchange,
    /// Quiescence notices received, indexed by rank; `notices[self]` is set
    /// when this worker sends its own.
    notices: Vec<bool>,
    sent_notice: bool,
    /// A decomposition ran out of budget; the orbit stays undone.
    exhausted: bool,
    deadline: Option<Instant>,
    params: &'a RunParams,
}

impl<C: Communicator> DistributedDriver<'_, C> {
    fn rank(&self) -> usize {
        self.comm.rank()
    }

    fn run(mut self) -> EngineResult<Option<Vec<Face>>> {
        let total_known = self.comm.all_reduce_max(self.db.number_orbits());
        if total_known == 0 {
            let seeds =
                sampling::compute_initial_set(self.ext, &self.params.initial_facet_heuristic)?;
            for (k, seed) in seeds.iter().enumerate() {
                self.route_face(seed, SEED_ORBIT, k as u32)?;
            }
        }

        loop {
            let budget_over =
                self.exhausted || self.deadline.is_some_and(|d| Instant::now() >= d);
            if !self.sent_notice
                && (budget_over || self.db.is_finished())
                && self.exchange.is_drained()
            {
                self.send_notice()?;
            }

            if let Some((src, message)) = self.comm.try_probe() {
                self.process_message(src, message)?;
            } else if !budget_over && !self.sent_notice && !self.db.is_finished() {
                if self.exchange.unsent_len() >= self.params.max_unsent_faces {
                    // Backpressure: drain before producing more.
                    self.exchange.flush_one(self.comm)?;
                } else {
                    self.process_one_orbit()?;
                }
            } else if self.exchange.flush_one(self.comm)? {
                // Flushed a batch; loop around for the next.
            } else if self.notices.iter().all(|&n| n) {
                break;
            } else {
                // Idle but peers are still running: bounded wait, then re-poll.
                std::thread::sleep(Duration::from_millis(self.params.idle_sleep_ms));
            }
        }
        self.conclude()
    }

    /// Canonicalizes a face and inserts it locally or queues it for its
    /// owning rank.
    fn route_face(&mut self, face: &Face, origin_orbit: u64, adjacency_index: u32) -> EngineResult<()> {
        let canonical = self.db.group().canonical_image(face)?;
        let dest = owner_of(&canonical, self.comm.size());
        if dest == self.rank() {
            self.db.insert(&canonical)?;
        } else {
            let hash = face_hash(&canonical, ROUTING_SEED);
            self.exchange.queue(
                dest,
                RoutedFace {
                    face: canonical,
                    hash,
                    origin_orbit,
                    adjacency_index,
                },
            );
        }
        Ok(())
    }

    fn process_message(&mut self, src: usize, message: Message) -> EngineResult<()> {
        match message {
            Message::NewFacets(batch) => {
                log::debug!(
                    "rank {}: received {} faces from rank {} (origin orbit {:?})",
                    self.rank(),
                    batch.faces.len(),
                    batch.origin_rank,
                    batch.faces.first().map(|f| f.origin_orbit),
                );
                for routed in &batch.faces {
                    self.db.insert(&routed.face)?;
                }
            }
            Message::Termination => {
                log::debug!("rank {}: received termination notice from {src}", self.rank());
                self.notices[src] = true;
            }
        }
        Ok(())
    }

    /// Decomposes the minimal undone orbit, routing every adjacent facet.
    fn process_one_orbit(&mut self) -> EngineResult<()> {
        let Some((id, face)) = self.db.minimal_undone() else {
            return Ok(());
        };
        let face = face.clone();
        let stabilizer = self.db.group().stabilizer(&face)?;
        let decomposer =
            Decomposer::new(self.ext, &self.bank, self.params, self.deadline, 0);
        match decomposer.decompose(&face, &stabilizer) {
            Ok(neighbors) => {
                for (k, neighbor) in neighbors.iter().enumerate() {
                    let canonical = self.db.group().canonical_image(neighbor)?;
                    self.db.record_adjacency(face.clone(), canonical);
                    self.route_face(neighbor, id.0, k as u32)?;
                }
                self.db.mark_done(id)?;
            }
            Err(EngineError::RuntimeExhausted) => {
                log::warn!(
                    "rank {}: decomposition of orbit {id} ran out of budget; leaving it undone",
                    self.rank(),
                );
                self.exhausted = true;
            }
            Err(fatal) => return Err(fatal),
        }
        Ok(())
    }

    /// One-shot "I will never send again" notice to every peer. After this
    /// the worker still receives and inserts, but never decomposes, so the
    /// promise holds.
    fn send_notice(&mut self) -> EngineResult<()> {
        log::info!(
            "rank {}: quiescent with {} orbits ({} undone); sending termination notice",
            self.rank(),
            self.db.number_orbits(),
            self.db.number_undone(),
        );
        for peer in 0..self.comm.size() {
            if peer != self.rank() {
                self.comm.send(peer, Message::Termination)?;
            }
        }
        let rank = self.rank();
        self.notices[rank] = true;
        self.sent_notice = true;
        Ok(())
    }

    /// Collective epilogue: confirm unanimity, gather everything at the
    /// root, certify connectedness, and agree on the outcome.
    fn conclude(mut self) -> EngineResult<Option<Vec<Face>>> {
        // Orbits finished in an earlier run have no recorded edges; re-derive
        // them so the root's connectedness check sees the whole graph. This
        // records locally and sends nothing, so the notice promise holds. An
        // error here must not skip the collectives (peers are already waiting
        // in them); it downgrades the local verdict instead.
        if let Err(e) = serial::ensure_adjacency_recorded(
            self.ext,
            &mut self.db,
            &self.bank,
            self.params,
            self.deadline,
        ) {
            log::warn!(
                "rank {}: could not re-derive adjacencies ({e}); reporting incomplete",
                self.rank(),
            );
            self.exhausted = true;
        }

        let locally_incomplete = u64::from(!self.db.is_finished() || self.exhausted);
        let any_incomplete = self.comm.all_reduce_max(locally_incomplete);

        let report = LocalReport {
            faces: self.db.representatives(),
            edges: self.db.adjacency_edges().to_vec(),
        };
        let gathered = self.comm.gather_reports(ROOT, report);

        let mut root_faces = None;
        let inconclusive_here = if self.rank() == ROOT {
            let reports = gathered.ok_or_else(|| {
                EngineError::Fatal("final gather produced nothing at the root".to_string())
            })?;
            let mut faces = vec![];
            let mut edges = vec![];
            for mut r in reports {
                faces.append(&mut r.faces);
                edges.append(&mut r.edges);
            }
            let connected = balinski::connectedness_holds(&faces, &edges);
            if !connected {
                log::warn!("gathered orbit adjacency graph is not connected");
            }
            root_faces = Some(faces);
            u64::from(any_incomplete == 1 || !connected)
        } else {
            0
        };

        if self.comm.all_reduce_max(inconclusive_here) == 1 {
            log::warn!(
                "rank {}: run is inconclusive; shard holds partial progress",
                self.rank(),
            );
            return Err(EngineError::RuntimeExhausted);
        }
        if self.rank() == ROOT {
            let faces = root_faces.unwrap_or_default();
            log::info!("run complete: {} facet orbits gathered", faces.len());
            Ok(Some(faces))
        } else {
            Ok(None)
        }
    }
}

/// Convenience harness: runs the distributed driver on `n_proc` in-process
/// workers over the channel transport and returns the root's result.
pub fn run_on_local_cluster(
    n_proc: usize,
    ext: &QMatrix,
    group: &PermGroup,
    params: &RunParams,
) -> EngineResult<Vec<Face>> {
    let cluster = crate::comm::ChannelComm::cluster(n_proc);
    let results: Vec<EngineResult<Option<Vec<Face>>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = cluster
            .into_iter()
            .map(|comm| scope.spawn(move || run_dual_desc_dist(&comm, ext, group, params)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(EngineError::Fatal("a worker thread panicked".to_string()))
                })
            })
            .collect()
    });
    let mut root_faces = None;
    for result in results {
        match result {
            Ok(Some(faces)) => root_faces = Some(faces),
            Ok(None) => {}
            Err(e) => return Err(e),
        }
    }
    root_faces.ok_or_else(|| EngineError::Fatal("no rank returned a result".to_string()))
}

//! One collision worker: a request loop around a sequential solver and a band
//! solver.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use log::{debug, trace};

use crate::core::{Error, Result};
use crate::domain::particle::STRIDE;
use crate::spatial::Band;
use crate::systems::collision::{
    BandSolver, BandWrites, SequentialSolver, SolveParams, SolveStats, TransportView,
};

use super::buffers::SharedRegion;
use super::protocol::{WorkerRequest, WorkerResponse};

pub struct Worker {
    id: usize,
    region: Option<Arc<SharedRegion>>,
    sequential: SequentialSolver,
    band: BandSolver,
}

impl Worker {
    pub fn new(id: usize, seed: u32) -> Self {
        Self {
            id,
            region: None,
            sequential: SequentialSolver::new(seed),
            band: BandSolver::new(seed),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Serve requests until either channel hangs up.
    pub fn run(mut self, requests: Receiver<WorkerRequest>, responses: Sender<WorkerResponse>) {
        debug!("collision worker {} started", self.id);
        while let Ok(request) = requests.recv() {
            if responses.send(self.handle(request)).is_err() {
                break;
            }
        }
        debug!("collision worker {} stopped", self.id);
    }

    pub fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        match request {
            WorkerRequest::Init => WorkerResponse::Ready { worker: self.id },
            WorkerRequest::InitShared { region } => {
                self.region = Some(region);
                WorkerResponse::Ready { worker: self.id }
            }
            WorkerRequest::Collide { frame, mut slots, elasticity, count, params } => {
                let len = (count * STRIDE).min(slots.len());
                let stats = {
                    let mut view = TransportView::new(&mut slots[..len], &elasticity);
                    self.sequential.solve(&mut view, &params)
                };
                trace!("worker {} solved frame {frame}: {} contacts", self.id, stats.contacts);
                WorkerResponse::Collided { frame, slots, stats }
            }
            WorkerRequest::CollideRange { frame, band, count, params } => {
                match self.solve_range(band, count, &params) {
                    Ok((writes, stats)) => WorkerResponse::RangeDone { frame, band, writes, stats },
                    Err(e) => WorkerResponse::Failed { worker: self.id, frame, reason: e.to_string() },
                }
            }
        }
    }

    fn solve_range(&mut self, band: Band, count: usize, params: &SolveParams) -> Result<(BandWrites, SolveStats)> {
        let Some(region) = self.region.as_ref() else {
            return Err(Error::invalid("range job before shared init"));
        };
        {
            let slots = region.read_slots()?;
            let elasticity = region.read_elasticity()?;
            let len = (count * STRIDE).min(slots.len());
            self.band.gather(&slots[..len], &elasticity, band, params);
        }
        Ok(self.band.run(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::particle::Particle;
    use crate::simulation::collide::buffers::{BufferMode, TransportBuffers};

    fn params() -> SolveParams {
        SolveParams { cell_size: 10.0, width: 100.0, height: 100.0, passes: 1 }
    }

    fn colliding() -> Vec<Particle> {
        vec![
            Particle::new(50.0, 50.0, 1.0, 0.0, 5.0, 1.0),
            Particle::new(56.0, 50.0, -1.0, 0.0, 5.0, 1.0),
        ]
    }

    #[test]
    fn init_answers_ready() {
        let mut w = Worker::new(3, 1);
        assert!(matches!(w.handle(WorkerRequest::Init), WorkerResponse::Ready { worker: 3 }));
    }

    #[test]
    fn collide_returns_solved_copy() {
        let mut buffers = TransportBuffers::new(BufferMode::Private);
        let mut ps = colliding();
        buffers.serialize(&mut ps).unwrap();
        let (slots, elasticity) = buffers.copy_out().unwrap();

        let mut w = Worker::new(0, 1);
        let reply = w.handle(WorkerRequest::Collide { frame: 7, slots, elasticity, count: 2, params: params() });
        let WorkerResponse::Collided { frame, slots, stats } = reply else {
            panic!("unexpected reply");
        };
        assert_eq!(frame, 7);
        assert_eq!(stats.impulses, 1);
        assert!((slots[STRIDE] - slots[0] - 10.0).abs() < 1e-4);
        assert!((slots[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn range_before_shared_init_fails() {
        let mut w = Worker::new(1, 1);
        let reply = w.handle(WorkerRequest::CollideRange {
            frame: 2,
            band: Band { start_row: 0, end_row: 10 },
            count: 0,
            params: params(),
        });
        assert!(matches!(reply, WorkerResponse::Failed { worker: 1, frame: 2, .. }));
    }

    #[test]
    fn range_reads_the_shared_region() {
        let mut buffers = TransportBuffers::new(BufferMode::Shared);
        let mut ps = colliding();
        buffers.serialize(&mut ps).unwrap();

        let mut w = Worker::new(0, 1);
        w.handle(WorkerRequest::InitShared { region: buffers.region() });
        let reply = w.handle(WorkerRequest::CollideRange {
            frame: 1,
            band: Band { start_row: 0, end_row: 10 },
            count: 2,
            params: params(),
        });
        let WorkerResponse::RangeDone { writes, stats, .. } = reply else {
            panic!("unexpected reply");
        };
        assert_eq!(writes.indices, vec![0, 1]);
        assert_eq!(stats.contacts, 1);
    }
}

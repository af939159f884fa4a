//! Sampled trajectories of a `Ctbn` and their CSV persistence.
//!
//! A trajectory is a chronological list of events, one per state change, opened by an event at
//! time zero and closed by an event at the time horizon for every variable. A `Trajectory`
//! holds several independent trajectories indexed by their sample id.

use crate::util::Result;

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;


/// A variable entering a state at some time
#[derive(Clone, Debug, PartialEq)]
pub struct Event {

    pub time: f64,

    pub variable: String,

    /// The label of the state entered
    pub state: String

}


impl Event {

    pub fn new(time: f64, variable: &str, state: &str) -> Self {
        Event { time, variable: String::from(variable), state: String::from(state) }
    }

}


/// One row of a trajectory file
#[derive(Debug, Serialize, Deserialize)]
struct Record {

    #[serde(rename = "IdSample")]
    id: usize,

    time: f64,

    var: String,

    state: String

}


/// A set of trajectories, ordered by sample id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {

    samples: BTreeMap<usize, Vec<Event>>

}


impl Trajectory {

    pub fn new() -> Self {
        Trajectory::default()
    }

    /// Set the events of sample `id`, replacing any previous ones
    pub fn insert(&mut self, id: usize, events: Vec<Event>) {
        self.samples.insert(id, events);
    }

    /// Append an event to sample `id`
    pub fn push(&mut self, id: usize, event: Event) {
        self.samples.entry(id).or_insert_with(Vec::new).push(event);
    }

    pub fn get(&self, id: usize) -> Option<&[Event]> {
        self.samples.get(&id).map(|e| e.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Event])> {
        self.samples.iter().map(|(&id, e)| (id, e.as_slice()))
    }

    /// The number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sorted names of the variables appearing in any sample
    pub fn variable_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.samples
                                        .values()
                                        .flat_map(|e| e.iter().map(|ev| ev.variable.as_str()))
                                        .collect();
        names.into_iter().map(String::from).collect()
    }

    /// The sorted labels observed for `variable`
    pub fn labels(&self, variable: &str) -> Vec<String> {
        let labels: BTreeSet<&str> = self.samples
                                         .values()
                                         .flat_map(|e| e.iter())
                                         .filter(|ev| ev.variable == variable)
                                         .map(|ev| ev.state.as_str())
                                         .collect();
        labels.into_iter().map(String::from).collect()
    }

    /// Write the trajectories as CSV with the columns ```IdSample,time,var,state```
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        for (&id, events) in self.samples.iter() {
            for e in events {
                wtr.serialize(Record { id, time: e.time, var: e.variable.clone(), state: e.state.clone() })?;
            }
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_writer(File::create(path)?)
    }

    /// Read trajectories written by `to_writer`. The events of every sample are stably sorted
    /// by time.
    ///
    /// # Errors
    /// Any malformed row fails the whole read.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut traj = Trajectory::new();

        for record in rdr.deserialize() {
            let record: Record = record?;
            traj.push(record.id, Event { time: record.time, variable: record.var, state: record.state });
        }

        for events in traj.samples.values_mut() {
            events.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
        }

        Ok(traj)
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Trajectory::from_reader(File::open(path)?)
    }

}


/// Read a trajectory file
pub fn read_trajectory_csv<P: AsRef<Path>>(path: P) -> Result<Trajectory> {
    Trajectory::read_csv(path)
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::util::CtbnError;

    fn sample() -> Trajectory {
        let mut traj = Trajectory::new();
        traj.insert(1, vec![
            Event::new(0., "A", "1"),
            Event::new(0., "B", "x"),
            Event::new(2.5, "A", "0"),
            Event::new(10., "A", "0"),
            Event::new(10., "B", "x")
        ]);
        traj.push(0, Event::new(0., "A", "0"));
        traj.push(0, Event::new(10., "A", "0"));
        traj
    }

    #[test]
    fn accessors() {
        let traj = sample();
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(traj.get(1).unwrap().len(), 5);
        assert!(traj.get(2).is_none());
        assert_eq!(traj.variable_names(), vec!["A", "B"]);
        assert_eq!(traj.labels("A"), vec!["0", "1"]);
        assert!(traj.labels("Z").is_empty());
    }

    #[test]
    fn csv_round_trip() {
        let traj = sample();
        let mut buffer = Vec::new();
        traj.to_writer(&mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("IdSample,time,var,state\n"));

        let copy = Trajectory::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(copy, traj);
    }

    #[test]
    fn sorted_on_read() {
        let text = "IdSample,time,var,state\n0,5.0,A,1\n0,0.0,A,0\n0,0.0,B,0\n0,9.0,A,1\n";
        let traj = Trajectory::from_reader(text.as_bytes()).unwrap();
        let times: Vec<f64> = traj.get(0).unwrap().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0., 0., 5., 9.]);
        assert_eq!(traj.get(0).unwrap()[0].variable, "A");
        assert_eq!(traj.get(0).unwrap()[1].variable, "B");
    }

    #[test]
    fn malformed() {
        let text = "IdSample,time,var,state\n0,0.0,A,0\nzero,1.0,A,1\n";
        match Trajectory::from_reader(text.as_bytes()).unwrap_err() {
            CtbnError::Csv(_) => (),
            e => panic!("incorrect error {:?}", e)
        };

        let text = "IdSample,time,var,state\n0,0.0,A\n";
        assert!(Trajectory::from_reader(text.as_bytes()).is_err());
    }

    #[test]
    fn file() {
        let path = std::env::temp_dir().join(format!("ctbn-trajectory-{}.csv", std::process::id()));
        let traj = sample();
        traj.write_csv(&path).unwrap();
        assert_eq!(read_trajectory_csv(&path).unwrap(), traj);
        std::fs::remove_file(&path).unwrap();

        assert!(read_trajectory_csv(&path).unwrap_err().to_string().len() > 0);
    }

}

use crate::error::CityResult;
use crate::global_variables::QUEUE_CITY_SUMMARY;
use crate::shared_data::CitySummary;
use crate::simulation_engine::air_quality::{AirQualityLevel, AirQualityMap};
use crate::simulation_engine::grid::GridPos;
use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, Exchange, Publish, QueueDeclareOptions,
    Result as AmiquipResult,
};
use log::{error, info, warn};
use plotters::prelude::*;
use serde::Serialize;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use tokio::task::JoinError;

// Generic helper to append a record to a CSV file, writing headers only once.
pub fn log_to_csv<T: Serialize>(filename: impl AsRef<Path>, record: &T) -> CityResult<()> {
    let filename = filename.as_ref();
    let file_exists = filename.exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn log_city_summary(filename: impl AsRef<Path>, record: &CitySummary) {
    if let Err(e) = log_to_csv(filename, record) {
        warn!("Error logging city summary: {}", e);
    }
}

pub fn read_city_summaries(filename: impl AsRef<Path>) -> CityResult<Vec<CitySummary>> {
    let mut rdr = csv::Reader::from_path(filename)?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

/// Roll-up of a series of summary records.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub records: usize,
    pub peak_pollution: f64,
    pub mean_average_pollution: f64,
    pub peak_vehicles: usize,
    pub last: Option<CitySummary>,
}

pub fn build_report(records: &[CitySummary]) -> SummaryReport {
    let peak_pollution = records
        .iter()
        .map(|r| r.max_pollution)
        .fold(0.0, f64::max);
    let mean_average_pollution = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.average_pollution).sum::<f64>() / records.len() as f64
    };
    SummaryReport {
        records: records.len(),
        peak_pollution,
        mean_average_pollution,
        peak_vehicles: records.iter().map(|r| r.vehicles).max().unwrap_or(0),
        last: records.last().cloned(),
    }
}

pub fn print_report(report: &SummaryReport) {
    println!("City Summary Report:");
    println!("Records: {}", report.records);
    println!("Peak pollution: {:.2}", report.peak_pollution);
    println!("Mean average pollution: {:.2}", report.mean_average_pollution);
    println!("Peak vehicles: {}", report.peak_vehicles);
    if let Some(last) = &report.last {
        println!(
            "Latest: {} roads, {} intersections, {} lights in {} controllers, {} buildings",
            last.road_cells,
            last.intersection_cells,
            last.traffic_light_cells,
            last.controllers,
            last.building_cells
        );
    }
}

fn level_color(value: f64) -> RGBColor {
    match AirQualityLevel::classify(value) {
        AirQualityLevel::Negligible => RGBColor(240, 240, 240),
        AirQualityLevel::Good => RGBColor(74, 222, 128),
        AirQualityLevel::Moderate => RGBColor(250, 204, 21),
        AirQualityLevel::Poor => RGBColor(248, 113, 113),
    }
}

// Draws one square per grid cell coloured by its air-quality band.
pub fn render_pollution_heatmap(
    filename: impl AsRef<Path>,
    grid_size: usize,
    air_quality: &AirQualityMap,
) -> Result<(), Box<dyn Error>> {
    let cell_px: u32 = 24;
    let side = grid_size as u32 * cell_px;
    let backend = BitMapBackend::new(filename.as_ref(), (side.max(1), side.max(1)));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    for y in 0..grid_size {
        for x in 0..grid_size {
            let value = air_quality.get(GridPos::new(x, y));
            let x0 = (x as u32 * cell_px) as i32;
            let y0 = (y as u32 * cell_px) as i32;
            let x1 = x0 + cell_px as i32;
            let y1 = y0 + cell_px as i32;
            root.draw(&Rectangle::new(
                [(x0, y0), (x1, y1)],
                level_color(value).filled(),
            ))?;
            root.draw(&Rectangle::new([(x0, y0), (x1, y1)], &BLACK))?;
        }
    }

    root.present()?;
    info!("Pollution heatmap saved to {}", filename.as_ref().display());
    Ok(())
}

/// Publishes city summaries as JSON to the summary queue.
pub struct SummaryPublisher {
    connection: Connection,
}

impl SummaryPublisher {
    pub fn connect(url: &str) -> AmiquipResult<Self> {
        let connection = Connection::insecure_open(url)?;
        Ok(Self { connection })
    }

    pub fn publish(&mut self, summary: &CitySummary) -> AmiquipResult<()> {
        let channel = self.connection.open_channel(None)?;
        channel.queue_declare(QUEUE_CITY_SUMMARY, QueueDeclareOptions::default())?;
        let exchange = Exchange::direct(&channel);
        match serde_json::to_vec(summary) {
            Ok(payload) => exchange.publish(Publish::new(&payload, QUEUE_CITY_SUMMARY))?,
            Err(e) => warn!("Error serializing city summary: {}", e),
        }
        channel.close()
    }

    pub fn close(self) -> AmiquipResult<()> {
        self.connection.close()
    }
}

/// Listens to the summary queue and logs each incoming record to CSV.
///
/// Returns when the consumer ends. Connection failures and a crashed consumer
/// thread are both reported as errors.
pub async fn listen_city_summaries(url: String, csv_path: String) -> CityResult<()> {
    let handle = tokio::task::spawn_blocking(move || -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(&url)?;
        let channel = connection.open_channel(None)?;
        let queue = channel.queue_declare(QUEUE_CITY_SUMMARY, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    match serde_json::from_slice::<CitySummary>(&delivery.body) {
                        Ok(record) => log_city_summary(&csv_path, &record),
                        Err(e) => warn!("Discarding malformed city summary: {}", e),
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    info!("City summary consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    });
    listener_outcome(handle.await)
}

fn listener_outcome(joined: Result<AmiquipResult<()>, JoinError>) -> CityResult<()> {
    match joined {
        Ok(result) => Ok(result?),
        Err(e) => {
            error!("City summary listener task failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CityError;

    fn summary(frame: u64, max: f64, avg: f64, vehicles: usize) -> CitySummary {
        CitySummary {
            timestamp: 1_700_000_000 + frame,
            frame,
            grid_size: 20,
            empty_cells: 300,
            road_cells: 80,
            building_cells: 15,
            intersection_cells: 4,
            traffic_light_cells: 1,
            controllers: 1,
            vehicles,
            polluted_cells: 2,
            min_pollution: 0.5,
            max_pollution: max,
            average_pollution: avg,
        }
    }

    #[test]
    fn summaries_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        log_city_summary(&path, &summary(1, 3.0, 1.0, 10));
        log_city_summary(&path, &summary(2, 7.5, 3.0, 12));

        let records = read_city_summaries(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].max_pollution, 7.5);

        let report = build_report(&records);
        assert_eq!(report.records, 2);
        assert_eq!(report.peak_pollution, 7.5);
        assert_eq!(report.mean_average_pollution, 2.0);
        assert_eq!(report.peak_vehicles, 12);
        assert_eq!(report.last.unwrap().frame, 2);
    }

    #[test]
    fn empty_report_is_all_zero() {
        let report = build_report(&[]);
        assert_eq!(report.records, 0);
        assert_eq!(report.peak_pollution, 0.0);
        assert!(report.last.is_none());
    }

    #[tokio::test]
    async fn crashed_listener_is_reported() {
        let joined = tokio::task::spawn_blocking(|| -> AmiquipResult<()> {
            panic!("consumer thread died")
        })
        .await;
        assert!(matches!(listener_outcome(joined), Err(CityError::Task(_))));
    }

    #[test]
    fn finished_listener_is_ok() {
        assert!(listener_outcome(Ok(Ok(()))).is_ok());
    }

    #[test]
    fn heatmap_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.png");
        let mut map = AirQualityMap::new();
        map.add(GridPos::new(1, 1), 12.0);
        map.add(GridPos::new(2, 3), 3.0);

        render_pollution_heatmap(&path, 4, &map).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}

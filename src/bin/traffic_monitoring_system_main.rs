use city_traffic_sim::global_variables::{AMQP_URL, SUMMARY_CSV};
use city_traffic_sim::monitoring::traffic_monitoring_system::{
    build_report, listen_city_summaries, print_report, read_city_summaries,
};
use log::error;
use std::io::{stdin, stdout, Write};

fn show_report(csv_path: &str) {
    match read_city_summaries(csv_path) {
        Ok(records) => print_report(&build_report(&records)),
        Err(e) => eprintln!("Error reading {}: {}", csv_path, e),
    }
}

async fn run_cli(csv_path: String) {
    loop {
        println!("\nCity Monitoring Admin CLI");
        println!("1. Display Summary Report");
        println!("2. Exit");
        print!("Enter your choice: ");
        let _ = stdout().flush();
        let input = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            stdin().read_line(&mut input).map(|_| input)
        })
        .await;
        let choice = match input {
            Ok(Ok(line)) => line.trim().parse::<u32>().unwrap_or(0),
            _ => 2,
        };
        match choice {
            1 => show_report(&csv_path),
            2 => {
                println!("Exiting CLI.");
                break;
            }
            _ => println!("Invalid choice. Try again."),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| AMQP_URL.to_string());
    let csv_path = std::env::args().nth(2).unwrap_or_else(|| SUMMARY_CSV.to_string());

    let listener = tokio::spawn(listen_city_summaries(url, csv_path.clone()));
    run_cli(csv_path).await;
    if listener.is_finished() {
        if let Ok(Err(e)) = listener.await {
            error!("City summary listener stopped: {}", e);
        }
    } else {
        listener.abort();
    }
}

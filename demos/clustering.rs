//! Group a handful of synthetic face embeddings with DBSCAN, then name new faces.
//!
//! Run with `RUST_LOG=huddle=debug` to see the per-run log lines.

use huddle::cluster::{util, Dbscan, KnnClassifier};
use tracing_subscriber::EnvFilter;

fn face(direction: &[f32]) -> Vec<f32> {
    let mut v = direction.to_vec();
    util::normalize(&mut v);
    v
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Three people in a 4D embedding space, plus one stray face.
    let data: Vec<Vec<f32>> = vec![
        // Person A
        face(&[1.0, 0.1, 0.0, 0.0]),
        face(&[0.95, 0.15, 0.05, 0.0]),
        face(&[1.0, 0.05, 0.1, 0.05]),
        // Person B
        face(&[0.0, 1.0, 0.1, 0.0]),
        face(&[0.1, 0.95, 0.0, 0.05]),
        face(&[0.05, 1.0, 0.05, 0.1]),
        // Stray
        face(&[0.5, -0.5, 0.5, -0.5]),
        // Person C
        face(&[0.0, 0.0, 0.1, 1.0]),
        face(&[0.05, 0.1, 0.0, 0.95]),
        face(&[0.0, 0.05, 0.05, 1.0]),
    ];

    let dbscan = Dbscan::new(0.95, 2);
    let assignment = match dbscan.cluster(&data) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("clustering failed: {e}");
            std::process::exit(1);
        }
    };

    println!("=== DBSCAN (eps=0.95, min_pts=2) ===");
    for (id, members) in assignment.groups().iter().enumerate() {
        println!("  group {id}: faces {members:?}");
    }
    println!("  unassigned: faces {:?}", assignment.noise());

    // Use the clustered faces as a gallery for new ones.
    let mut knn = KnnClassifier::new(3, 0.9);
    let (gallery, labels): (Vec<Vec<f32>>, Vec<usize>) = data
        .iter()
        .zip(assignment.labels())
        .filter(|&(_, &l)| l != assignment.noise_id())
        .map(|(v, &l)| (v.clone(), l))
        .unzip();
    if let Err(e) = knn.fit(&gallery, &labels) {
        eprintln!("fit failed: {e}");
        std::process::exit(1);
    }

    println!("\n=== kNN (k=3, threshold=0.9) ===");
    for query in [face(&[0.9, 0.1, 0.1, 0.0]), face(&[-1.0, 0.0, 0.0, 0.0])] {
        match knn.predict(&query) {
            Ok(Some(p)) => println!(
                "  {query:.2?} => group {} (similarity {:.3}, {} votes)",
                p.label, p.similarity, p.votes
            ),
            Ok(None) => println!("  {query:.2?} => unknown"),
            Err(e) => println!("  {query:.2?} => error: {e}"),
        }
    }
}

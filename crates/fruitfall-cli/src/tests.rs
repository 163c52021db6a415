use super::*;

#[test]
fn parses_clusters_command() {
    let cli = Cli::try_parse_from([
        "fruitfall",
        "clusters",
        "--geojson",
        "trees.geojson",
        "--zoom",
        "6.5",
        "--max-zoom",
        "12",
        "--radius",
        "40",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Clusters {
            geojson,
            zoom,
            bbox,
            cluster,
        } => {
            assert_eq!(geojson, PathBuf::from("trees.geojson"));
            assert!((zoom - 6.5).abs() < f64::EPSILON);
            assert!(bbox.is_none());
            assert_eq!(cluster.max_zoom, 12);
            assert_eq!(cluster.radius, 40);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn parses_bbox_with_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "fruitfall",
        "clusters",
        "--geojson",
        "trees.geojson",
        "--zoom",
        "3",
        "--bbox",
        "-97.5,43.0,-89.0,49.5",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Clusters {
            bbox: Some(Bbox {
                west,
                north,
                ..
            }),
            ..
        } if (west + 97.5).abs() < f64::EPSILON && (north - 49.5).abs() < f64::EPSILON
    ));
}

#[test]
fn parse_bbox_rejects_bad_input() {
    assert!(parse_bbox("1,2,3").is_err());
    assert!(parse_bbox("a,b,c,d").is_err());
    assert!(parse_bbox("0,10,1,5").is_err());
    assert!(parse_bbox("0,NaN,1,5").is_err());
    assert!(parse_bbox("170,-10,-170,10").is_ok());
}

#[test]
fn parses_expand_command() {
    let cli = Cli::try_parse_from([
        "fruitfall",
        "expand",
        "--geojson",
        "trees.geojson",
        "--cluster-id",
        "2081",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Expand {
            cluster_id: 2081,
            ..
        }
    ));
}

#[test]
fn parses_detail_command() {
    let cli = Cli::try_parse_from(["fruitfall", "detail", "--id", "42"]).unwrap();
    assert!(matches!(cli.command, Commands::Detail { id: 42 }));
}

#[test]
fn parses_replay_command() {
    let cli = Cli::try_parse_from([
        "fruitfall",
        "replay",
        "--geojson",
        "trees.geojson",
        "--events",
        "script.json",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Replay { .. }));
}

#[test]
fn command_is_required() {
    assert!(Cli::try_parse_from(["fruitfall"]).is_err());
}

//! Property-based tests for configuration validation and pw-cat command
//! building.

use async_trait::async_trait;
use proptest::prelude::*;
use pwctl::{
    Controller, Error,
    types::{
        config::{
            ALLOWED_CHANNELS, AudioConfigRequest, MAX_QUALITY, RECOMMENDED_RATES, SampleFormat,
            Settings,
        },
        process::{CommandLine, CommandOutput, RecordOutput},
    },
    utils::{
        command::{Mode, build_cat_command},
        runner::Runner,
    },
};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

const CORE_FLAGS: [&str; 5] = ["--rate", "--channels", "--format", "--volume", "--quality"];

/// Counts invocations and fails every one of them.
#[derive(Default)]
struct CountingRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl Runner for CountingRunner {
    async fn run(&self, command: &CommandLine) -> pwctl::Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::ExecutableNotFound(command.program.clone()))
    }

    async fn run_with_timeout(
        &self,
        command: &CommandLine,
        _deadline: Duration,
        _grace: Duration,
    ) -> pwctl::Result<RecordOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::ExecutableNotFound(command.program.clone()))
    }
}

fn valid_request() -> impl Strategy<Value = AudioConfigRequest> {
    (
        (
            prop::sample::select(RECOMMENDED_RATES.to_vec()),
            prop::sample::select(ALLOWED_CHANNELS.to_vec()),
            prop::sample::select(SampleFormat::ALL.to_vec()),
            0.0f32..=1.0f32,
            0..=MAX_QUALITY,
        ),
        (
            prop::option::of("[a-z0-9_.]{1,12}"),
            prop::option::of("[0-9]{1,4}(ms|/48000)"),
            prop::option::of("Audio|Midi"),
            prop::option::of("Playback|Capture"),
            prop::option::of("Music|Movie|Game"),
            prop::option::of("mono|stereo|FL,FR"),
        ),
    )
        .prop_map(
            |(
                (rate, channels, format, volume, quality),
                (target, latency, media_type, media_category, media_role, channel_map),
            )| AudioConfigRequest {
                rate: Some(rate),
                channels: Some(channels),
                format: Some(format.to_string()),
                volume: Some(volume),
                quality: Some(quality),
                target,
                latency,
                media_type,
                media_category,
                media_role,
                channel_map,
            },
        )
}

fn field_of(err: Error) -> &'static str {
    match err {
        Error::InvalidConfiguration { field, .. } => field,
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }
}

fn occurrences(args: &[String], flag: &str) -> usize {
    args.iter().filter(|arg| arg.as_str() == flag).count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every valid configuration yields each core flag exactly once, the
    /// optional flags exactly when set, in a fixed order, with the path last.
    #[test]
    fn valid_config_has_one_flag_per_field(
        request in valid_request(),
        record in any::<bool>(),
    ) {
        let mode = if record { Mode::Record } else { Mode::Playback };
        let config = request.validate().unwrap();
        let command = build_cat_command("pw-cat", mode, &config, Path::new("take.wav"));
        let args = command.args_lossy();

        prop_assert_eq!(occurrences(&args, mode.flag()), 1);
        for flag in CORE_FLAGS {
            prop_assert_eq!(occurrences(&args, flag), 1, "flag {}", flag);
        }

        let optional = [
            ("--target", request.target.is_some()),
            ("--latency", request.latency.is_some()),
            ("--media-type", request.media_type.is_some()),
            ("--media-category", request.media_category.is_some()),
            ("--media-role", request.media_role.is_some()),
            ("--channel-map", request.channel_map.is_some()),
        ];
        for (flag, set) in optional {
            prop_assert_eq!(occurrences(&args, flag), usize::from(set), "flag {}", flag);
        }

        let expected: Vec<&str> = std::iter::once(mode.flag())
            .chain(CORE_FLAGS)
            .chain(optional.iter().filter(|(_, set)| *set).map(|(flag, _)| *flag))
            .collect();
        let flags: Vec<&str> = args
            .iter()
            .map(String::as_str)
            .filter(|arg| arg.starts_with("--"))
            .collect();
        prop_assert_eq!(flags, expected);
        prop_assert_eq!(args.last().map(String::as_str), Some("take.wav"));
    }

    /// Assigning the fields in any order produces the same command.
    #[test]
    fn field_assignment_order_is_irrelevant(
        request in valid_request(),
        order in Just((0..11usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mut shuffled = AudioConfigRequest::default();
        for field in order {
            match field {
                0 => shuffled.rate = request.rate,
                1 => shuffled.channels = request.channels,
                2 => shuffled.format = request.format.clone(),
                3 => shuffled.volume = request.volume,
                4 => shuffled.quality = request.quality,
                5 => shuffled.target = request.target.clone(),
                6 => shuffled.latency = request.latency.clone(),
                7 => shuffled.media_type = request.media_type.clone(),
                8 => shuffled.media_category = request.media_category.clone(),
                9 => shuffled.media_role = request.media_role.clone(),
                _ => shuffled.channel_map = request.channel_map.clone(),
            }
        }

        let path = Path::new("song.wav");
        let expected = request.validate().unwrap();
        let actual = shuffled.validate().unwrap();
        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(
            build_cat_command("pw-cat", Mode::Playback, &actual, path),
            build_cat_command("pw-cat", Mode::Playback, &expected, path)
        );
    }

    #[test]
    fn rate_outside_allow_list_is_rejected(
        rate in any::<u32>()
            .prop_filter("allowed rate", |rate| !RECOMMENDED_RATES.contains(rate)),
    ) {
        let request = AudioConfigRequest { rate: Some(rate), ..Default::default() };
        prop_assert_eq!(field_of(request.validate().unwrap_err()), "rate");
    }

    #[test]
    fn channels_outside_allow_list_are_rejected(
        channels in any::<u8>()
            .prop_filter("allowed channels", |c| !ALLOWED_CHANNELS.contains(c)),
    ) {
        let request = AudioConfigRequest { channels: Some(channels), ..Default::default() };
        prop_assert_eq!(field_of(request.validate().unwrap_err()), "channels");
    }

    #[test]
    fn quality_above_maximum_is_rejected(quality in (MAX_QUALITY + 1)..=u8::MAX) {
        let request = AudioConfigRequest { quality: Some(quality), ..Default::default() };
        prop_assert_eq!(field_of(request.validate().unwrap_err()), "quality");
    }

    #[test]
    fn volume_outside_unit_range_is_rejected(
        volume in prop_oneof![-1.0e6f32..-f32::EPSILON, 1.0001f32..1.0e6f32],
    ) {
        let request = AudioConfigRequest { volume: Some(volume), ..Default::default() };
        prop_assert_eq!(field_of(request.validate().unwrap_err()), "volume");
    }

    #[test]
    fn unknown_format_is_rejected(format in "[a-z]{1,3}[0-9]{0,2}") {
        prop_assume!(SampleFormat::ALL.iter().all(|known| known.as_str() != format));
        let request = AudioConfigRequest { format: Some(format), ..Default::default() };
        prop_assert_eq!(field_of(request.validate().unwrap_err()), "format");
    }

    /// A rejected configuration never reaches the runner, for playback or
    /// recording.
    #[test]
    fn invalid_config_never_spawns(
        rate in any::<u32>()
            .prop_filter("allowed rate", |rate| !RECOMMENDED_RATES.contains(rate)),
        record in any::<bool>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let runner = Arc::new(CountingRunner::default());
        let controller = Controller::new(Settings::default(), runner.clone());
        let request = AudioConfigRequest { rate: Some(rate), ..Default::default() };

        let err = runtime.block_on(async {
            if record {
                controller.record("take.wav", &request, Some(1)).await.map(|_| ())
            } else {
                controller.play("song.wav", &request).await.map(|_| ())
            }
        });

        prop_assert_eq!(field_of(err.unwrap_err()), "rate");
        prop_assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }
}

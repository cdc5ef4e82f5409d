// The Leptos front end only exists on wasm32; native builds get an empty entry point.
#[cfg(not(target_arch = "wasm32"))]
fn main() {}

#[cfg(target_arch = "wasm32")]
pub use app::main;

#[cfg(target_arch = "wasm32")]
mod app {

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use geoquiz::generate::{
    area_code_to_prefecture, boundary_questions, municipality_questions, prefecture_questions,
};
use geoquiz::wasm::{HttpBoundarySource, LocalStorage};
use geoquiz::{
    Answer, AnswerScheme, BoundaryCache, BoundaryCollection, BoundaryKey, BoundaryLoad, Content,
    DEMO_MAP_SURFACE, DEMO_QUESTION_COUNT, EngineConfig, Feedback, GeoQuiz, GestureTracker,
    LoadState, MapProjection, MapSurface, MemoryStorage, Phase, Point, ProgressStore, QuizDomain,
    QuizPlan, QuizQuestion, QuizSession, QuizTuning, Rect, RegionHitTester, RegionIndex, Scope,
    StorageBackend, SurfaceSize, ViewportController, demo_content, level_name,
};
use leptos::*;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen_futures::spawn_local;

type Store = Rc<ProgressStore<Box<dyn StorageBackend>>>;
type Generator = Box<dyn FnMut(&mut dyn RngCore, &QuizPlan) -> Option<Vec<QuizQuestion>>>;
type DemoSession = QuizSession<GeoQuiz<Generator, Store>, StdRng>;

/// Prefecture whose ward outlines the map-click mode loads.
const WARD_PREFECTURE: &str = "27";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Prefectures,
    Municipalities,
    AreaCodes,
    Wards,
}

impl Mode {
    const ALL: [Mode; 4] = [
        Mode::Prefectures,
        Mode::Municipalities,
        Mode::AreaCodes,
        Mode::Wards,
    ];

    fn label(self) -> &'static str {
        match self {
            Mode::Prefectures => "都道府県",
            Mode::Municipalities => "市区町村",
            Mode::AreaCodes => "市外局番",
            Mode::Wards => "大阪府の区",
        }
    }

    fn plan(self) -> QuizPlan {
        match self {
            Mode::Prefectures => {
                QuizPlan::new(QuizDomain::Prefecture, Scope::National, DEMO_QUESTION_COUNT)
            }
            Mode::Municipalities => {
                QuizPlan::new(QuizDomain::Municipality, Scope::National, DEMO_QUESTION_COUNT)
            }
            Mode::AreaCodes => {
                QuizPlan::new(QuizDomain::AreaCode, Scope::National, DEMO_QUESTION_COUNT)
            }
            Mode::Wards => QuizPlan::new(
                QuizDomain::Municipality,
                Scope::Prefecture(WARD_PREFECTURE.to_string()),
                DEMO_QUESTION_COUNT,
            ),
        }
    }

    fn domain(self) -> QuizDomain {
        self.plan().domain
    }
}

#[derive(Clone, PartialEq)]
struct Snapshot {
    phase: Phase,
    question: Option<QuizQuestion>,
    position: usize,
    total: usize,
    correct: usize,
    feedback: Feedback,
    answered: Option<bool>,
}

impl Snapshot {
    fn of(session: &DemoSession) -> Self {
        Self {
            phase: session.phase(),
            question: session.current_question().cloned(),
            position: session.current_index(),
            total: session.questions().len(),
            correct: session.correct_count(),
            feedback: session.feedback(),
            answered: session.last_result(),
        }
    }
}

fn open_store(tuning: &QuizTuning) -> Store {
    let backend: Box<dyn StorageBackend> = match LocalStorage::open() {
        Ok(storage) => Box::new(storage),
        Err(error) => {
            log::warn!("{error}; progress is kept in memory only");
            Box::new(MemoryStorage::new())
        }
    };
    Rc::new(ProgressStore::with_tuning(backend, tuning))
}

fn build_session(
    mode: Mode,
    content: &Rc<Content>,
    wards: &Rc<RefCell<BoundaryLoad>>,
    store: &Store,
    tuning: QuizTuning,
) -> DemoSession {
    let content = content.clone();
    let generator: Generator = match mode {
        Mode::Prefectures => Box::new(move |rng: &mut dyn RngCore, plan: &QuizPlan| {
            Some(prefecture_questions(
                rng,
                &content.prefectures,
                &plan.scope,
                plan.draw,
            ))
        }),
        Mode::Municipalities => Box::new(move |rng: &mut dyn RngCore, plan: &QuizPlan| {
            Some(municipality_questions(
                rng,
                &content.prefectures,
                &plan.scope,
                plan.draw,
            ))
        }),
        Mode::AreaCodes => Box::new(move |rng: &mut dyn RngCore, plan: &QuizPlan| {
            Some(area_code_to_prefecture(
                rng,
                &content.area_codes,
                &content.prefectures,
                &plan.scope,
                plan.draw,
            ))
        }),
        Mode::Wards => {
            let wards = wards.clone();
            Box::new(move |rng: &mut dyn RngCore, plan: &QuizPlan| {
                let data = wards.borrow().data()?;
                Some(boundary_questions(rng, &data, plan.draw))
            })
        }
    };

    let plan = mode.plan().with_distractors(tuning.distractor_count);

    QuizSession::new(
        GeoQuiz::new(plan, generator, store.clone()),
        StdRng::from_entropy(),
    )
    .with_feedback_ms(tuning.feedback_ms)
}

/// Viewport and touch state shared by every question of the page.
struct MapInput {
    viewport: ViewportController,
    gestures: GestureTracker,
}

/// One region outline as drawn on the map.
#[derive(Clone, PartialEq)]
struct Outline {
    code: String,
    path: String,
}

/// Client-space origin and size of the element an event is bound to.
fn element_frame(event: &web_sys::Event) -> Option<(Point, SurfaceSize)> {
    let element = event.current_target()?.dyn_into::<web_sys::Element>().ok()?;
    let rect = element.get_bounding_client_rect();

    Some((
        Point::new(rect.left(), rect.top()),
        SurfaceSize::new(rect.width().max(1.0), rect.height().max(1.0)),
    ))
}

fn touch_points(touches: &web_sys::TouchList, origin: Point) -> Vec<Point> {
    (0..touches.length())
        .filter_map(|index| touches.item(index))
        .map(|touch| {
            Point::new(
                f64::from(touch.client_x()) - origin.x,
                f64::from(touch.client_y()) - origin.y,
            )
        })
        .collect()
}

#[component]
fn MapPanel(
    surface: ReadSignal<MapSurface>,
    outlines: ReadSignal<Vec<Outline>>,
    snapshot: ReadSignal<Snapshot>,
    input: StoredValue<MapInput>,
    viewport: ReadSignal<Rect>,
    set_viewport: WriteSignal<Rect>,
    hit_tester: StoredValue<Option<RegionHitTester>>,
    choose: Callback<Answer>,
) -> impl IntoView {
    let apply = move |change: fn(&mut ViewportController) -> Rect| {
        let mut next = None;
        input.update_value(|input| next = Some(change(&mut input.viewport)));
        if let Some(rect) = next {
            set_viewport.set(rect);
        }
    };

    let on_touch_start = move |ev: ev::TouchEvent| {
        let Some((origin, size)) = element_frame(&ev) else {
            return;
        };
        let points = touch_points(&ev.touches(), origin);
        input.update_value(|input| {
            input.gestures.set_surface(size);
            input.gestures.touch_start(&points);
        });
    };

    let on_touch_move = move |ev: ev::TouchEvent| {
        let Some((origin, _)) = element_frame(&ev) else {
            return;
        };
        ev.prevent_default();
        let points = touch_points(&ev.touches(), origin);

        let mut moved = None;
        input.update_value(|input| {
            if input.gestures.touch_move(&points, &mut input.viewport) {
                moved = Some(input.viewport.viewport());
            }
        });
        if let Some(rect) = moved {
            set_viewport.set(rect);
        }
    };

    let on_touch_end = move |ev: ev::TouchEvent| {
        let Some((origin, _)) = element_frame(&ev) else {
            return;
        };
        let points = touch_points(&ev.touches(), origin);

        let mut current = None;
        input.update_value(|input| {
            let outcome = input
                .gestures
                .touch_end(&points, ev.time_stamp(), &mut input.viewport);
            log::debug!("touch sequence ended: {outcome:?}");
            current = Some(input.viewport.viewport());
        });
        if let Some(rect) = current {
            set_viewport.set(rect);
        }
    };

    // releases that ended a pan or pinch are swallowed by the hit tester
    let on_click = move |ev: ev::MouseEvent| {
        let Some((origin, size)) = element_frame(&ev) else {
            return;
        };
        let screen = Point::new(
            f64::from(ev.client_x()) - origin.x,
            f64::from(ev.client_y()) - origin.y,
        );

        let mut click = None;
        input.with_value(|input| {
            let at = input.viewport.screen_to_map(screen, size);
            hit_tester.with_value(|tester| {
                click = tester
                    .as_ref()
                    .and_then(|tester| tester.hit(at, &input.gestures));
            });
        });
        if let Some(click) = click {
            choose.call(click.into());
        }
    };

    view! {
        <section class="map-panel">
            <svg
                class="map"
                viewBox=move || viewport.get().to_view_box()
                preserveAspectRatio="none"
                on:touchstart=on_touch_start
                on:touchmove=on_touch_move
                on:touchend=on_touch_end
                on:touchcancel=move |_| input.update_value(|input| input.gestures.touch_cancel())
                on:click=on_click
            >
                <rect
                    class="map-extent"
                    x=move || surface.get().extent.x
                    y=move || surface.get().extent.y
                    width=move || surface.get().extent.width
                    height=move || surface.get().extent.height
                ></rect>
                {move || {
                    let snap = snapshot.get();
                    let answered = snap.answered.is_some();
                    let correct = snap
                        .question
                        .map(|question| question.correct_answer_id)
                        .unwrap_or_default();

                    outlines
                        .get()
                        .into_iter()
                        .map(|outline| {
                            let class = if answered && outline.code == correct {
                                "region correct"
                            } else {
                                "region"
                            };
                            view! { <path class=class d=outline.path></path> }
                        })
                        .collect_view()
                }}
                {move || {
                    snapshot
                        .get()
                        .question
                        .and_then(|question| question.prompt.location)
                        .map(|position| {
                            let point = surface.get().projection.project_latlng(position);
                            view! { <circle class="marker" cx=point.x cy=point.y r="8"></circle> }
                        })
                }}
            </svg>
            <div class="header-actions">
                <button class="pill" on:click=move |_| apply(|viewport| viewport.zoom_by(0.8, None))>
                    "拡大"
                </button>
                <button class="pill" on:click=move |_| apply(|viewport| viewport.zoom_by(1.25, None))>
                    "縮小"
                </button>
                <button class="pill" on:click=move |_| apply(ViewportController::reset_to_full_extent)>
                    "全体"
                </button>
            </div>
        </section>
    }
}

#[component]
fn QuestionCard(
    question: QuizQuestion,
    position: usize,
    total: usize,
    feedback: Feedback,
    answered: Option<bool>,
    /// Answered by clicking a region on the map instead of an option.
    map_answers: bool,
    choose: Callback<Answer>,
    next: Callback<()>,
) -> impl IntoView {
    let card_class = match feedback {
        Feedback::Idle => "quiz-card",
        Feedback::Correct => "quiz-card flash-correct",
        Feedback::Wrong => "quiz-card flash-wrong",
    };
    let correct_id = question.correct_answer_id.clone();

    view! {
        <section class=card_class>
            <div class="prompt-area">
                <p class="eyebrow">{format!("{} / {}", position + 1, total)}</p>
                <p class="prompt">{question.prompt.text.clone()}</p>
                {question.prompt.detail.clone().map(|detail| view! { <p class="lede">{detail}</p> })}
            </div>
            {map_answers.then(|| view! { <p class="lede">"地図上の区域をタップしてください"</p> })}
            {(!map_answers).then(|| {
                view! {
                    <div class="options-grid">
                        {question
                            .options
                            .iter()
                            .enumerate()
                            .map(|(index, option)| {
                                let id = option.id.clone();
                                let status = if answered.is_some() && option.id == correct_id {
                                    "option correct"
                                } else {
                                    "option"
                                };
                                view! {
                                    <button
                                        class=status
                                        disabled=answered.is_some()
                                        on:click=move |_| choose.call(Answer::choice(id.clone()))
                                    >
                                        <span class="option-index">{(index + 1).to_string()}</span>
                                        <span class="option-body">{option.label.clone()}</span>
                                    </button>
                                }
                            })
                            .collect_view()}
                    </div>
                }
            })}
            {answered.map(|is_correct| {
                view! {
                    <div class="overlay-actions">
                        <p class=if is_correct { "result-title correct" } else { "result-title incorrect" }>
                            {if is_correct { "正解！" } else { "不正解" }}
                        </p>
                        {question.explanation.clone().map(|text| view! { <p class="lede">{text}</p> })}
                        <button class="btn btn-primary" type="button" on:click=move |_| next.call(())>
                            "次へ"
                        </button>
                    </div>
                }
            })}
        </section>
    }
}

#[component]
fn App() -> impl IntoView {
    let config = EngineConfig::default();
    let tuning = config.quiz;
    let national = match MapSurface::from_json(DEMO_MAP_SURFACE) {
        Ok(surface) => surface,
        Err(error) => {
            log::warn!("map calibration unusable: {error}");
            return view! { <p class="error-body">{error.to_string()}</p> }.into_view();
        }
    };
    let content = Rc::new(demo_content());
    let store = open_store(&tuning);
    let cache = Rc::new(BoundaryCache::new(HttpBoundarySource::new(config.data.clone())));
    let wards = Rc::new(RefCell::new(BoundaryLoad::new()));

    let mut first = build_session(Mode::Prefectures, &content, &wards, &store, tuning);
    first.start();
    let session = store_value(first);

    let (mode, set_mode) = create_signal(Mode::Prefectures);
    let (snapshot, set_snapshot) = create_signal(session.with_value(Snapshot::of));
    let (boundary, set_boundary) = create_signal(LoadState::Idle);
    let (summary, set_summary) = create_signal(String::new());

    let (surface, set_surface) = create_signal(national);
    let (outlines, set_outlines) = create_signal(Vec::<Outline>::new());
    let (viewport, set_viewport) = create_signal(national.extent);
    let input = store_value(MapInput {
        viewport: ViewportController::with_config(national.extent, config.viewport),
        gestures: GestureTracker::with_config(
            SurfaceSize::new(national.extent.width, national.extent.height),
            config.gesture,
        ),
    });
    let hit_tester = store_value(None::<RegionHitTester>);

    let refresh = move || set_snapshot.set(session.with_value(Snapshot::of));
    let set_map_interactive = move |interactive: bool| {
        hit_tester.update_value(|tester| {
            if let Some(tester) = tester.as_mut() {
                tester.set_interactive(interactive);
            }
        });
    };

    let refresh_summary = {
        let store = store.clone();
        move |mode: Mode| {
            let record = store.progress(mode.domain());
            let curriculum = store.curriculum();
            set_summary.set(format!(
                "{}: 正答率 {}%（{} 回） / レベル {}",
                mode.label(),
                record.accuracy(),
                record.quizzes_completed,
                level_name(curriculum.level)
            ));
        }
    };
    refresh_summary(Mode::Prefectures);

    let show_wards = move |data: &BoundaryCollection| {
        let Some((south_west, north_east)) = data.bounds() else {
            log::warn!("ward boundaries have no outlines");
            return;
        };
        let fitted = MapSurface {
            extent: national.extent,
            projection: MapProjection::fit(national.extent, south_west, north_east),
        };

        set_outlines.set(
            data.regions()
                .iter()
                .map(|region| Outline {
                    code: region.code.clone(),
                    path: region.svg_path(&fitted.projection),
                })
                .collect(),
        );
        hit_tester.set_value(Some(RegionHitTester::new(
            RegionIndex::projected(data, &fitted.projection),
            true,
        )));
        set_surface.set(fitted);
    };

    let sync_boundary = {
        let wards = wards.clone();
        move || {
            let state = wards.borrow().state().clone();
            if let LoadState::Ready(data) = &state {
                show_wards(data);
                session.update_value(|session| {
                    if session.phase() == Phase::Loading {
                        session.start();
                    }
                });
            }
            set_boundary.set(state);
            refresh();
        }
    };

    let request_wards = {
        let cache = cache.clone();
        let wards = wards.clone();
        let sync = sync_boundary.clone();
        move |retry: bool| {
            let ticket = {
                let mut load = wards.borrow_mut();
                if retry {
                    load.retry(&cache)
                } else {
                    load.begin(BoundaryKey::municipalities(WARD_PREFECTURE), &cache)
                }
            };
            sync();

            if let Some(ticket) = ticket {
                let cache = cache.clone();
                let wards = wards.clone();
                let sync = sync.clone();
                spawn_local(async move {
                    let result = cache.load(ticket.key()).await;
                    wards.borrow_mut().complete(&ticket, result);
                    sync();
                });
            }
        }
    };

    let retry_wards = {
        let request_wards = request_wards.clone();
        Callback::new(move |_: ()| request_wards(true))
    };

    let switch_mode = {
        let content = content.clone();
        let wards = wards.clone();
        let store = store.clone();
        let refresh_summary = refresh_summary.clone();
        Callback::new(move |next: Mode| {
            input.update_value(|input| {
                input.viewport.reset_to_full_extent();
                input.gestures.touch_cancel();
            });
            set_viewport.set(national.extent);
            if next != Mode::Wards {
                wards.borrow_mut().cancel();
                hit_tester.set_value(None);
                set_outlines.set(Vec::new());
                set_surface.set(national);
            }

            set_mode.set(next);
            let mut fresh = build_session(next, &content, &wards, &store, tuning);
            fresh.start();
            session.set_value(fresh);
            refresh_summary(next);

            if next == Mode::Wards {
                request_wards(false);
            } else {
                refresh();
            }
        })
    };

    let choose = Callback::new(move |answer: Answer| {
        let mut result = None;
        session.update_value(|session| result = session.submit_answer(answer));
        if result.is_none() {
            return;
        }
        set_map_interactive(false);
        refresh();

        let duration = Duration::from_millis(u64::from(session.with_value(|session| session.feedback_ms())));
        set_timeout(
            move || {
                session.update_value(|session| session.clear_feedback());
                refresh();
            },
            duration,
        );
    });

    let next_question = Callback::new(move |_: ()| {
        let mut phase = Phase::Loading;
        session.update_value(|session| phase = session.next());
        if phase == Phase::Complete {
            refresh_summary(mode.get_untracked());
        }
        set_map_interactive(true);
        refresh();
    });

    let retry = Callback::new(move |_: ()| {
        session.update_value(|session| {
            session.retry();
        });
        set_map_interactive(true);
        refresh();
    });

    view! {
        <main class="page">
            <header class="page-header">
                <div>
                    <p class="eyebrow">"Geography Quiz"</p>
                    <h1 class="headline">"都道府県・市区町村クイズ"</h1>
                    <p class="lede">{move || summary.get()}</p>
                </div>
                <div class="header-actions">
                    {Mode::ALL
                        .into_iter()
                        .map(|option| {
                            view! {
                                <button
                                    class=move || if mode.get() == option { "pill active" } else { "pill" }
                                    on:click=move |_| switch_mode.call(option)
                                >
                                    {option.label()}
                                </button>
                            }
                        })
                        .collect_view()}
                </div>
            </header>

            {move || {
                let snap = snapshot.get();
                match snap.phase {
                    Phase::Loading => match boundary.get() {
                        LoadState::Failed(message) => view! {
                            <section class="error-card">
                                <p class="eyebrow">"境界データを読み込めませんでした"</p>
                                <p class="error-body">{message}</p>
                                <button class="primary" on:click=move |_| retry_wards.call(())>
                                    "再試行"
                                </button>
                            </section>
                        }
                        .into_view(),
                        _ => view! {
                            <section class="placeholder-card">
                                <p class="lede">"読み込み中…"</p>
                            </section>
                        }
                        .into_view(),
                    },
                    Phase::Empty => view! {
                        <section class="placeholder-card">
                            <p class="lede">"出題できる問題がありません。"</p>
                        </section>
                    }
                    .into_view(),
                    Phase::Complete => view! {
                        <section class="quiz-card">
                            <p class="prompt">{format!("{} / {} 問正解", snap.correct, snap.total)}</p>
                            <button class="primary" on:click=move |_| retry.call(())>
                                "もう一度"
                            </button>
                        </section>
                    }
                    .into_view(),
                    Phase::InProgress => match snap.question {
                        Some(question) => {
                            let map_answers = question.scheme == AnswerScheme::FeatureCode;
                            view! {
                            <QuestionCard
                                map_answers=map_answers
                                question=question
                                position=snap.position
                                total=snap.total
                                feedback=snap.feedback
                                answered=snap.answered
                                choose=choose
                                next=next_question
                            />
                            }
                            .into_view()
                        }
                        None => ().into_view(),
                    },
                }
            }}

            <MapPanel
                surface=surface
                outlines=outlines
                snapshot=snapshot
                input=input
                viewport=viewport
                set_viewport=set_viewport
                hit_tester=hit_tester
                choose=choose
            />
        </main>
    }
    .into_view()
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(|| view! { <App /> });
}
}

//! Sample data served when a backend read fails.
//!
//! Everything here is deterministic: the same call always yields the same
//! rows, so clients and tests can rely on the shapes and the ordering.
//! Only the relative timestamps of notifications, messages and bookmarks
//! follow the wall clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use flock_types::api::FeedPage;
use flock_types::models::{
    AuthorSummary, Bookmark, BookmarkCollection, Community, ContentSnippet, Conversation, Message,
    Notification, NotificationKind, Post, TrendingTopic, User,
};

use crate::middleware::AuthUser;

/// 2024-06-01T12:00:00Z, the newest fixture post is this old.
const POSTS_ANCHOR: i64 = 1_717_243_200;

const DEFAULT_AVATAR: &str = "/general/avatar.png";

pub const POPULAR_HASHTAGS: [&str; 20] = [
    "#Programming",
    "#JavaScript",
    "#React",
    "#NextJS",
    "#WebDev",
    "#AI",
    "#MachineLearning",
    "#DataScience",
    "#Blockchain",
    "#Crypto",
    "#TechNews",
    "#ProductDevelopment",
    "#UX",
    "#Design",
    "#StartupLife",
    "#Gaming",
    "#WorkFromHome",
    "#Technology",
    "#Innovation",
    "#SoftwareEngineering",
];

// (username, name, bio, location, website, followers, following, joined)
type UserRow = (&'static str, &'static str, &'static str, &'static str, &'static str, i64, i64, (i32, u32, u32));

const USERS: [UserRow; 10] = [
    ("techguru", "Tech Guru", "Software engineer and tech enthusiast. Building the future one line of code at a time.", "San Francisco, CA", "https://techguru.dev", 15432, 1254, (2020, 3, 15)),
    ("designmaster", "Design Master", "UI/UX Designer. Creating beautiful, functional, and accessible designs.", "New York, NY", "https://designmaster.io", 8976, 867, (2019, 7, 22)),
    ("airesearcher", "AI Researcher", "Studying artificial intelligence and machine learning. PhD in Computer Science.", "Boston, MA", "https://ai-research.org", 12345, 543, (2018, 11, 5)),
    ("newsreporter", "News Reporter", "Breaking news and technology trends. Journalist for TechDaily.", "Washington, DC", "https://techdaily.com", 25678, 1876, (2017, 5, 12)),
    ("startupfounder", "Startup Founder", "CEO and Founder of TechStartup. Building the next unicorn.", "Austin, TX", "https://techstartup.io", 9876, 765, (2019, 2, 28)),
    ("dataanalyst", "Data Analyst", "Finding insights in data. Passionate about statistics and visualization.", "Chicago, IL", "https://datainsights.co", 7654, 876, (2020, 1, 15)),
    ("webdeveloper", "Web Developer", "Full-stack developer specializing in React and Node.js.", "Seattle, WA", "https://webdev.codes", 5432, 654, (2021, 4, 10)),
    ("cryptoenthusiast", "Crypto Enthusiast", "Blockchain technology advocate. Investing in the future of finance.", "Miami, FL", "https://crypto-future.net", 11234, 987, (2018, 9, 20)),
    ("productmanager", "Product Manager", "Building products that solve real problems. User-centric and data-driven.", "Portland, OR", "https://productbuilder.io", 8765, 876, (2019, 11, 11)),
    ("gamingpro", "Gaming Pro", "Professional gamer and streamer. Join me on Twitch!", "Los Angeles, CA", "https://twitch.tv/gamingpro", 32145, 1243, (2017, 12, 5)),
];

const POST_TEMPLATES: [(&str, &str); 10] = [
    ("Just published my latest article on ", ". Check it out and let me know what you think!"),
    ("Excited to share my latest project using ", ". It's been an amazing journey!"),
    ("Attending a conference on ", " next week. Anyone else going?"),
    ("My thoughts on the future of ", " - I believe we're just scratching the surface."),
    ("Looking for recommendations on learning ", ". What resources did you find helpful?"),
    ("Just solved a challenging problem with ", ". So satisfying when the code finally works!"),
    ("Great discussion today about ", " with some brilliant minds in the industry."),
    ("New tutorial on ", " is now available. Link in bio!"),
    ("What's your favorite tool for ", "? I'm currently using XYZ and loving it."),
    ("Hot take: ", " is changing faster than most can keep up with. Focus on fundamentals!"),
];

fn day(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn ago(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    now - Duration::minutes(minutes)
}

fn author(id: &str, username: &str, name: &str) -> AuthorSummary {
    AuthorSummary {
        id: Some(id.to_string()),
        username: username.to_string(),
        name: name.to_string(),
        avatar_url: Some(DEFAULT_AVATAR.to_string()),
    }
}

// -- Users & posts --

pub fn users() -> Vec<User> {
    USERS
        .iter()
        .enumerate()
        .map(|(i, (username, name, bio, location, website, followers, following, (y, m, d)))| {
            let n = i + 1;
            User {
                id: format!("user{n}"),
                username: username.to_string(),
                name: name.to_string(),
                email: None,
                avatar_url: Some(format!("/general/user{n}.png")),
                cover_url: Some(format!("/general/cover{n}.jpg")),
                bio: Some(bio.to_string()),
                location: Some(location.to_string()),
                website: Some(website.to_string()),
                followers_count: *followers,
                following_count: *following,
                created_at: day(*y, *m, *d),
            }
        })
        .collect()
}

/// Ten posts per fixture user, newest first.
pub fn posts() -> Vec<Post> {
    let anchor = DateTime::from_timestamp(POSTS_ANCHOR, 0).unwrap_or_default();
    let mut posts = Vec::with_capacity(USERS.len() * 10);

    for (u, user) in users().iter().enumerate() {
        for i in 1..=10usize {
            let seed = u * 10 + (i - 1);
            let count = 1 + seed % 3;
            let hashtags: Vec<String> = (0..count)
                .map(|k| POPULAR_HASHTAGS[(seed * 7 + k * 3) % POPULAR_HASHTAGS.len()].to_string())
                .collect();
            let (before, after) = POST_TEMPLATES[(seed * 3) % POST_TEMPLATES.len()];
            let with_media = seed % 4 == 0;

            posts.push(Post {
                id: format!("post_{}_{}", user.id, i),
                created_at: anchor - Duration::hours(((seed * 53) % 720) as i64),
                content: format!("{before}{}{after}", hashtags.join(" ")),
                user_id: user.id.clone(),
                media_urls: with_media.then(|| vec!["/general/post_image.jpg".to_string()]),
                media_types: with_media.then(|| vec!["image".to_string()]),
                likes_count: ((seed * 379) % 1000) as i64,
                comments_count: ((seed * 61) % 100) as i64,
                reposts_count: ((seed * 17) % 50) as i64,
                users: Some(user.summary()),
                hashtags,
                ..Default::default()
            });
        }
    }

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

pub fn feed_page(page: u32, limit: u32) -> FeedPage {
    let all = posts();
    let start = (page as usize).saturating_mul(limit as usize);
    let page_posts: Vec<Post> = all.iter().skip(start).take(limit as usize).cloned().collect();
    FeedPage {
        has_more: start + page_posts.len() < all.len(),
        posts: page_posts,
    }
}

/// Posts of the fixture user with this username; empty for anyone else.
pub fn posts_by_username(username: &str) -> Vec<Post> {
    let Some(user) = users().into_iter().find(|u| u.username == username) else {
        return Vec::new();
    };
    posts().into_iter().filter(|p| p.user_id == user.id).collect()
}

/// Posts tagged with `hashtag` (a missing `#` is added), matched without
/// regard to case against the tag list or the text.
pub fn filter_by_hashtag(posts: Vec<Post>, hashtag: &str) -> Vec<Post> {
    let tag = if hashtag.starts_with('#') {
        hashtag.to_lowercase()
    } else {
        format!("#{}", hashtag.to_lowercase())
    };
    posts
        .into_iter()
        .filter(|post| {
            post.hashtags.iter().any(|t| t.to_lowercase() == tag)
                || post.content.to_lowercase().contains(&tag)
        })
        .collect()
}

/// Users to suggest following.
pub fn suggested_users() -> Vec<User> {
    users().into_iter().take(3).collect()
}

// -- Topics --

/// Side-panel trending topics.
pub fn trending_topics() -> Vec<TrendingTopic> {
    const ROWS: [(&str, i64, &str); 10] = [
        ("#Programming", 12500, "Technology"),
        ("#AI", 8740, "Technology"),
        ("#WebDev", 5230, "Technology"),
        ("#Blockchain", 3890, "Cryptocurrency"),
        ("#WorkFromHome", 2150, "Lifestyle"),
        ("#NextJS", 1850, "Technology"),
        ("#Gaming", 4320, "Entertainment"),
        ("#UX", 1750, "Design"),
        ("#StartupLife", 2250, "Business"),
        ("#Innovation", 3100, "Business"),
    ];
    ROWS.iter()
        .enumerate()
        .map(|(i, (tag, count, category))| TrendingTopic {
            id: (i + 1).to_string(),
            tag: tag.to_string(),
            posts_count: *count,
            category: Some(category.to_string()),
            image_url: (i == 0).then(|| "/general/trending1.jpg".to_string()),
        })
        .collect()
}

/// Topics on the explore page.
pub fn explore_topics() -> Vec<TrendingTopic> {
    const ROWS: [(&str, i64); 10] = [
        ("#Technology", 12489),
        ("#Programming", 5263),
        ("#WebDevelopment", 3845),
        ("#React", 2734),
        ("#JavaScript", 1932),
        ("#AI", 4521),
        ("#MachineLearning", 3256),
        ("#DataScience", 2892),
        ("#Python", 4127),
        ("#CloudComputing", 1843),
    ];
    ROWS.iter()
        .enumerate()
        .map(|(i, (tag, count))| TrendingTopic {
            id: (i + 1).to_string(),
            tag: tag.to_string(),
            posts_count: *count,
            category: None,
            image_url: None,
        })
        .collect()
}

// -- Communities --

pub fn communities() -> Vec<Community> {
    const ROWS: [(&str, &str, i64, (i32, u32, u32)); 5] = [
        ("JavaScript Developers", "A community for JavaScript developers to share knowledge, ask questions, and collaborate on projects.", 12580, (2020, 1, 15)),
        ("UI/UX Designers", "Share your designs, get feedback, and discuss the latest trends in UI/UX design.", 8750, (2020, 3, 22)),
        ("AI Researchers", "Discuss artificial intelligence research, share papers, and collaborate on AI projects.", 5430, (2019, 11, 5)),
        ("Startup Founders", "Connect with other startup founders, share your experiences, and get advice.", 6780, (2021, 2, 18)),
        ("Blockchain Developers", "A community for blockchain developers to discuss technology, projects, and opportunities.", 4320, (2020, 8, 10)),
    ];
    ROWS.iter()
        .enumerate()
        .map(|(i, (name, description, members, (y, m, d)))| Community {
            id: format!("community{}", i + 1),
            name: name.to_string(),
            description: description.to_string(),
            member_count: *members,
            image_url: Some(format!("/general/community{}.jpg", i + 1)),
            is_private: false,
            created_at: day(*y, *m, *d),
            is_member: false,
        })
        .collect()
}

// -- Notifications --

pub fn notifications(user_id: &str) -> Vec<Notification> {
    let now = Utc::now();
    let rows: [(NotificationKind, &str, &str, Option<(&str, &str)>, i64, bool); 5] = [
        (NotificationKind::Follow, "elonmusk", "Elon Musk", None, 25, false),
        (NotificationKind::Like, "BillGates", "Bill Gates", Some(("post1", "This is an amazing post about technology!")), 3 * 60, false),
        (NotificationKind::Repost, "SatyaNadella", "Satya Nadella", Some(("post2", "Thoughts on the future of cloud computing...")), 24 * 60, true),
        (NotificationKind::Comment, "sundarpichai", "Sundar Pichai", Some(("post1", "This is an amazing post about technology!")), 2 * 24 * 60, true),
        (NotificationKind::Mention, "timcook", "Tim Cook", Some(("post3", "Hey @user, what do you think about the new product launch?")), 3 * 24 * 60, true),
    ];

    rows.into_iter()
        .enumerate()
        .map(|(i, (kind, username, name, post, minutes, seen))| {
            let actor_id = format!("actor{}", i + 1);
            Notification {
                id: (i + 1).to_string(),
                created_at: ago(now, minutes),
                user_id: user_id.to_string(),
                actor: Some(author(&actor_id, username, name)),
                actor_id,
                kind,
                post_id: post.map(|(id, _)| id.to_string()),
                comment_id: None,
                seen,
                post: post.map(|(id, content)| ContentSnippet {
                    id: Some(id.to_string()),
                    content: content.to_string(),
                }),
                comment: None,
            }
        })
        .collect()
}

// -- Bookmarks --

pub fn bookmarks(user_id: &str) -> Vec<Bookmark> {
    let now = Utc::now();
    let rows: [(&str, &str, i64, (i64, i64, i64), (&str, &str, &str)); 3] = [
        ("post1", "This is a great post about web development that I saved for later reference!", 2, (45, 12, 8), ("user1", "developer", "Web Developer")),
        ("post2", "Understanding React hooks is essential for modern web development. Here are my top 5 tips for using useEffect properly...", 5, (127, 23, 42), ("user2", "reactmaster", "React Expert")),
        ("post3", "Just launched our new product! Check it out at example.com - would love your feedback!", 1, (89, 34, 15), ("user3", "techfounder", "Tech Founder")),
    ];

    rows.into_iter()
        .enumerate()
        .map(|(i, (post_id, content, days, (likes, comments, reposts), (uid, username, name)))| Bookmark {
            id: (i + 1).to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: now,
            collection_id: None,
            post: Some(Post {
                id: post_id.to_string(),
                created_at: now - Duration::days(days),
                content: content.to_string(),
                user_id: uid.to_string(),
                likes_count: likes,
                comments_count: comments,
                reposts_count: reposts,
                users: Some(author(uid, username, name)),
                ..Default::default()
            }),
        })
        .collect()
}

pub fn collections(user_id: &str) -> Vec<BookmarkCollection> {
    let now = Utc::now();
    [("col1", "Development Resources", 2), ("col2", "Inspiration", 1)]
        .into_iter()
        .map(|(id, name, post_count)| BookmarkCollection {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Some(now),
            post_count,
        })
        .collect()
}

// -- Messages --

fn conversation_partners() -> [AuthorSummary; 3] {
    [
        author("user1", "johndoe", "John Doe"),
        author("user2", "janesmith", "Jane Smith"),
        author("user3", "techteam", "Tech Support"),
    ]
}

pub fn conversations(user_id: &str) -> Vec<Conversation> {
    let now = Utc::now();
    let [john, jane, support] = conversation_partners();
    let message = |id: &str, from: &str, to: &str, content: &str, minutes: i64, is_read: bool| Message {
        id: id.to_string(),
        sender_id: from.to_string(),
        receiver_id: to.to_string(),
        content: content.to_string(),
        created_at: ago(now, minutes),
        is_read,
        sender: None,
        receiver: None,
    };

    vec![
        Conversation {
            last_message: message("msg1", "user1", user_id, "Hey! Did you see the latest features on the app?", 20, false),
            user: john,
            unread_count: 3,
        },
        Conversation {
            last_message: message("msg2", user_id, "user2", "Thanks for helping me with that project!", 2 * 60, true),
            user: jane,
            unread_count: 0,
        },
        Conversation {
            last_message: message("msg3", "user3", user_id, "Your request has been processed. Please let us know if you need anything else.", 24 * 60, true),
            user: support,
            unread_count: 0,
        },
    ]
}

/// A short sample thread between the caller and `other_id`, oldest first.
/// Unknown counterparts get a placeholder author.
pub fn thread(me: &AuthUser, other_id: &str) -> Vec<Message> {
    let now = Utc::now();
    let my_id = me.id_str();
    let mine = AuthorSummary {
        id: Some(my_id.clone()),
        username: me.username.clone().unwrap_or_else(|| "me".into()),
        name: "Me".into(),
        avatar_url: Some(DEFAULT_AVATAR.to_string()),
    };
    let theirs = conversation_partners()
        .into_iter()
        .find(|p| p.id.as_deref() == Some(other_id))
        .unwrap_or_else(|| author(other_id, "user", "User"));

    let message = |id: &str, outgoing: bool, content: &str, minutes: i64, is_read: bool| {
        let (from, to) = if outgoing { (&mine, &theirs) } else { (&theirs, &mine) };
        Message {
            id: id.to_string(),
            sender_id: from.id.clone().unwrap_or_default(),
            receiver_id: to.id.clone().unwrap_or_default(),
            content: content.to_string(),
            created_at: ago(now, minutes),
            is_read,
            sender: Some(from.clone()),
            receiver: Some(to.clone()),
        }
    };

    let mut thread = vec![
        message("msg1", true, "Hey there! How are you doing?", 3 * 60, true),
        message("msg2", false, "I'm doing great! Just checking out this app.", 2 * 60, true),
        message("msg3", true, "It's pretty cool, right? They just added this messaging feature!", 30, true),
    ];
    if other_id == "user1" {
        thread.push(message(
            "msg4",
            false,
            "Yeah, the messaging is great! Did you also see they added bookmarks collections?",
            25,
            true,
        ));
        thread.push(message("msg5", false, "Hey! Are you still there?", 20, false));
    }
    thread
}
